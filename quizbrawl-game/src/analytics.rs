//! Aggregate statistics rebuilt from run and monster history.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::RECENT_RUN_WINDOW;
use crate::numbers::percent;
use crate::storage::{Collection, EngineError, RecordStore, load_all};

/// One finished (or abandoned) run, appended to the `runs` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunRecord {
    pub id: String,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// `clear`, `failed`, or any other value for runs that ended otherwise.
    pub result: String,
    pub difficulty: Option<u8>,
    pub total_answers: u32,
    pub correct_answers: u32,
    pub best_combo: u32,
    pub earned_gold: u64,
    pub defeated_monsters: Vec<String>,
}

impl RunRecord {
    /// Wall-clock length, when both timestamps were recorded.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        Some(self.end_time?.saturating_sub(self.start_time?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptStats {
    pub attempts: u64,
    pub correct: u64,
}

/// A question encounter with its cumulative answer counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterRecord {
    pub id: String,
    pub subject: String,
    pub difficulty: u8,
    pub stats: AttemptStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Accuracy {
    pub attempts: u64,
    pub correct: u64,
    /// Rounded percentage; 0 without attempts.
    pub rate: u32,
}

impl Accuracy {
    fn add(&mut self, stats: AttemptStats) {
        self.attempts = self.attempts.saturating_add(stats.attempts);
        self.correct = self.correct.saturating_add(stats.correct);
        self.rate = percent(self.correct, self.attempts);
    }
}

/// Derived statistics. Always rebuilt wholesale from history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_runs: u64,
    pub total_clears: u64,
    pub total_fails: u64,
    pub win_rate: u32,
    pub total_answers: u64,
    pub total_correct: u64,
    pub avg_accuracy: u32,
    pub best_combo: u32,
    pub best_streak: u32,
    pub current_streak: u32,
    pub total_gold_earned: u64,
    pub total_defeated_monsters: u64,
    pub longest_run_ms: u64,
    pub shortest_clear_ms: Option<u64>,
    pub total_play_time_ms: u64,
    pub avg_run_duration_ms: u64,
    pub recent_win_rate: u32,
    pub recent_accuracy: u32,
    pub subject_accuracy: BTreeMap<String, Accuracy>,
    pub difficulty_accuracy: BTreeMap<u8, Accuracy>,
    pub most_played_subject: Option<String>,
}

/// Rebuild the snapshot from complete history.
///
/// Runs are ordered by start time before streaks are walked, so storage
/// order never matters. Results other than `clear` and `failed` still count
/// as runs but leave clears, fails and the streak alone.
#[must_use]
pub fn aggregate_stats(runs: &[RunRecord], monsters: &[MonsterRecord]) -> StatsSnapshot {
    let mut ordered: Vec<&RunRecord> = runs.iter().collect();
    ordered.sort_by_key(|run| run.start_time);

    let mut snapshot = StatsSnapshot::default();
    let mut streak = 0_u32;
    let mut timed_runs = 0_u64;
    for run in &ordered {
        snapshot.total_runs += 1;
        match run.result.as_str() {
            "clear" => {
                snapshot.total_clears += 1;
                streak = streak.saturating_add(1);
                snapshot.best_streak = snapshot.best_streak.max(streak);
            }
            "failed" => {
                snapshot.total_fails += 1;
                streak = 0;
            }
            _ => {}
        }
        snapshot.total_answers += u64::from(run.total_answers);
        snapshot.total_correct += u64::from(run.correct_answers);
        snapshot.best_combo = snapshot.best_combo.max(run.best_combo);
        snapshot.total_gold_earned = snapshot.total_gold_earned.saturating_add(run.earned_gold);
        snapshot.total_defeated_monsters += run.defeated_monsters.len() as u64;

        if let Some(duration) = run.duration_ms() {
            timed_runs += 1;
            snapshot.total_play_time_ms = snapshot.total_play_time_ms.saturating_add(duration);
            snapshot.longest_run_ms = snapshot.longest_run_ms.max(duration);
            if run.result == "clear" {
                snapshot.shortest_clear_ms = Some(
                    snapshot
                        .shortest_clear_ms
                        .map_or(duration, |best| best.min(duration)),
                );
            }
        }
    }
    snapshot.current_streak = streak;
    snapshot.win_rate = percent(snapshot.total_clears, snapshot.total_runs);
    snapshot.avg_accuracy = percent(snapshot.total_correct, snapshot.total_answers);
    if timed_runs > 0 {
        snapshot.avg_run_duration_ms = (snapshot.total_play_time_ms + timed_runs / 2) / timed_runs;
    }

    let recent = &ordered[ordered.len().saturating_sub(RECENT_RUN_WINDOW)..];
    let recent_clears = recent.iter().filter(|run| run.result == "clear").count();
    let (recent_correct, recent_answers) = recent.iter().fold((0_u64, 0_u64), |(c, a), run| {
        (c + u64::from(run.correct_answers), a + u64::from(run.total_answers))
    });
    snapshot.recent_win_rate = percent(recent_clears as u64, recent.len() as u64);
    snapshot.recent_accuracy = percent(recent_correct, recent_answers);

    for monster in monsters {
        snapshot
            .subject_accuracy
            .entry(monster.subject.clone())
            .or_default()
            .add(monster.stats);
        snapshot
            .difficulty_accuracy
            .entry(monster.difficulty)
            .or_default()
            .add(monster.stats);
    }
    snapshot.most_played_subject = snapshot
        .subject_accuracy
        .iter()
        .filter(|(_, acc)| acc.attempts > 0)
        .fold(None::<(&String, u64)>, |best, (subject, acc)| match best {
            Some((_, attempts)) if attempts >= acc.attempts => best,
            _ => Some((subject, acc.attempts)),
        })
        .map(|(subject, _)| subject.clone());

    snapshot
}

/// Cached snapshot, replaced wholesale on every refresh.
#[derive(Debug, Clone, Default)]
pub struct StatsCache {
    snapshot: Option<StatsSnapshot>,
}

impl StatsCache {
    #[must_use]
    pub const fn new() -> Self {
        Self { snapshot: None }
    }

    #[must_use]
    pub const fn snapshot(&self) -> Option<&StatsSnapshot> {
        self.snapshot.as_ref()
    }

    /// Re-read all history from `store` and rebuild the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn refresh<S: RecordStore>(&mut self, store: &S) -> Result<&StatsSnapshot, EngineError> {
        let runs: Vec<RunRecord> = load_all(store, Collection::Runs)?;
        let monsters: Vec<MonsterRecord> = load_all(store, Collection::Monsters)?;
        log::debug!(
            "rebuilding stats from {} runs and {} monsters",
            runs.len(),
            monsters.len()
        );
        Ok(self.snapshot.insert(aggregate_stats(&runs, &monsters)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, put_record};

    fn run(start: u64, end: Option<u64>, result: &str) -> RunRecord {
        RunRecord {
            id: start.to_string(),
            start_time: Some(start),
            end_time: end,
            result: result.into(),
            total_answers: 10,
            correct_answers: 7,
            best_combo: 4,
            earned_gold: 20,
            defeated_monsters: vec!["Slime".into(), "Bat".into()],
            ..RunRecord::default()
        }
    }

    fn monster(subject: &str, difficulty: u8, attempts: u64, correct: u64) -> MonsterRecord {
        MonsterRecord {
            id: format!("{subject}-{difficulty}"),
            subject: subject.into(),
            difficulty,
            stats: AttemptStats { attempts, correct },
        }
    }

    #[test]
    fn empty_history_has_zero_rates() {
        let snapshot = aggregate_stats(&[], &[]);
        assert_eq!(snapshot, StatsSnapshot::default());
        assert_eq!(snapshot.win_rate, 0);
        assert_eq!(snapshot.recent_accuracy, 0);
    }

    #[test]
    fn clear_then_fail_leaves_streak_broken() {
        let runs = [run(2, Some(3), "failed"), run(1, Some(2), "clear")];
        let snapshot = aggregate_stats(&runs, &[]);
        assert_eq!(snapshot.best_streak, 1);
        assert_eq!(snapshot.current_streak, 0);
        assert_eq!(snapshot.win_rate, 50);
    }

    #[test]
    fn other_results_count_as_runs_only() {
        let runs = [
            run(1, Some(100), "clear"),
            run(2, None, "abandoned"),
            run(3, Some(50), "clear"),
        ];
        let snapshot = aggregate_stats(&runs, &[]);
        assert_eq!(snapshot.total_runs, 3);
        assert_eq!(snapshot.total_clears, 2);
        assert_eq!(snapshot.total_fails, 0);
        assert_eq!(snapshot.best_streak, 2);
        assert_eq!(snapshot.current_streak, 2);
        assert_eq!(snapshot.win_rate, 67);
        assert_eq!(snapshot.total_answers, 30);
        assert_eq!(snapshot.avg_accuracy, 70);
        assert_eq!(snapshot.total_defeated_monsters, 6);
        // the abandoned run has no end time
        assert_eq!(snapshot.total_play_time_ms, 99 + 47);
        assert_eq!(snapshot.longest_run_ms, 99);
        assert_eq!(snapshot.shortest_clear_ms, Some(47));
        assert_eq!(snapshot.avg_run_duration_ms, 73);
    }

    #[test]
    fn recent_window_covers_last_ten_runs() {
        let mut runs: Vec<RunRecord> = (0..5).map(|i| run(i, Some(i + 1), "clear")).collect();
        runs.extend((5..15).map(|i| run(i, Some(i + 1), "failed")));
        let snapshot = aggregate_stats(&runs, &[]);
        assert_eq!(snapshot.recent_win_rate, 0);
        assert_eq!(snapshot.win_rate, 33);
        assert_eq!(snapshot.best_streak, 5);
    }

    #[test]
    fn monster_accuracy_is_separate_from_runs() {
        let monsters = [
            monster("math", 1, 10, 9),
            monster("math", 3, 10, 1),
            monster("history", 1, 20, 10),
            monster("art", 2, 0, 0),
        ];
        let snapshot = aggregate_stats(&[], &monsters);
        assert_eq!(snapshot.subject_accuracy["math"].rate, 50);
        assert_eq!(snapshot.difficulty_accuracy[&1].attempts, 30);
        assert_eq!(snapshot.difficulty_accuracy[&1].rate, 63);
        assert_eq!(snapshot.subject_accuracy["art"].rate, 0);
        assert_eq!(snapshot.avg_accuracy, 0);
        // 20 attempts each; alphabetical tie-break
        assert_eq!(snapshot.most_played_subject.as_deref(), Some("history"));
    }

    #[test]
    fn cache_rebuilds_from_store() {
        let store = MemoryStore::new();
        let mut cache = StatsCache::new();
        assert!(cache.snapshot().is_none());
        put_record(&store, Collection::Runs, "a", &run(1, Some(2), "clear")).unwrap();
        assert_eq!(cache.refresh(&store).unwrap().total_runs, 1);
        put_record(&store, Collection::Runs, "b", &run(3, Some(4), "failed")).unwrap();
        put_record(&store, Collection::Monsters, "m", &monster("math", 2, 4, 3)).unwrap();
        let snapshot = cache.refresh(&store).unwrap();
        assert_eq!(snapshot.total_runs, 2);
        assert_eq!(snapshot.subject_accuracy["math"].rate, 75);
        assert_eq!(cache.snapshot().unwrap().total_fails, 1);
    }
}
