//! Cooperative timer queue driven by a virtual clock.
//!
//! Nothing here sleeps. The owner advances the clock and drains due tasks,
//! which keeps deferred effects deterministic under test.
use std::collections::BTreeMap;

/// Handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    now: u64,
    next_seq: u64,
    pending: BTreeMap<(u64, u64), T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Due time of the earliest pending task.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Schedule `task` to fall due `delay_ms` after the current time.
    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending
            .insert((self.now.saturating_add(delay_ms), seq), task);
        TimerId(seq)
    }

    /// Remove a pending task. Returns it if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let key = *self.pending.keys().find(|(_, seq)| *seq == id.0)?;
        self.pending.remove(&key)
    }

    /// Pop the earliest task due at or before `until`, moving the clock to
    /// its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until: u64) -> Option<T> {
        let (&(due, seq), _) = self.pending.iter().next()?;
        if due > until {
            return None;
        }
        self.now = self.now.max(due);
        self.pending.remove(&(due, seq))
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, until: u64) {
        self.now = self.now.max(until);
    }
}
