//! Progression engine: the owned player aggregate, derived stat totals,
//! experience intake, and the save path every other engine routes through.
use std::rc::Rc;

use crate::config::GameConfig;
use crate::constants::{
    DEFAULT_DAMAGE, DEFAULT_HP, MAX_LEVEL_DAMAGE_BONUS, MAX_LEVEL_HP_BONUS, MAX_LEVEL_TIME_BONUS,
    MSG_LEVEL_BONUS_DAMAGE, MSG_LEVEL_BONUS_HP, MSG_LEVEL_BONUS_TIME, MSG_MAX_LEVEL, PLAYER_KEY,
    REMOTE_SYNC_DEBOUNCE_MS, STARTING_LEVEL, TIME_BASE_EASY, TIME_BASE_HARD, TIME_BASE_NORMAL,
    UPGRADE_DAMAGE, UPGRADE_HP, UPGRADE_TIME,
};
use crate::feedback::{Feedback, SoundCue};
use crate::player::{MigrationReport, Player, StoredPlayer};
use crate::reward::{self, DropRoll};
use crate::rng::{RngBundle, derive_stream_seed};
use crate::run::RunState;
use crate::storage::{Collection, EngineError, RecordStore, RemoteSession, put_record};
use crate::timers::{TimerId, TimerQueue};

/// Difficulty used when describing level-up time bonuses.
const REFERENCE_DIFFICULTY: u8 = 2;

/// Seed and wall-clock origin for an engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub seed: u64,
    /// Wall-clock milliseconds at which the virtual clock reads zero.
    pub epoch_ms: u64,
}

/// Work parked on the timer queue.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Deferred {
    RemoteSync,
    BonusDrop(DropRoll),
    ClearNotice { token: u64 },
}

/// Levels reached by a single experience grant, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpOutcome {
    pub levels_gained: Vec<u32>,
}

impl ExpOutcome {
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        !self.levels_gained.is_empty()
    }
}

fn at_max_level(player: &Player, config: &GameConfig) -> bool {
    player.level >= config.levels.max_level
}

fn upgrade_bonus(player: &Player, config: &GameConfig, id: &str) -> u32 {
    config.upgrade(id).map_or(0, |def| {
        player.upgrade_level(id).saturating_mul(def.value)
    })
}

fn achievement_bonus(player: &Player, config: &GameConfig) -> (u32, u32) {
    player
        .achievements
        .iter()
        .filter_map(|id| config.achievements.get(id))
        .fold((0_u32, 0_u32), |(hp, dmg), bonus| {
            (hp.saturating_add(bonus.hp), dmg.saturating_add(bonus.damage))
        })
}

/// Maximum hit points derived from level, upgrades and achievements.
#[must_use]
pub fn max_hp(player: &Player, config: &GameConfig) -> u32 {
    let levels = &config.levels;
    let level_bonus = player.level.saturating_sub(1).saturating_mul(levels.hp_per_level);
    let cap_bonus = if at_max_level(player, config) {
        MAX_LEVEL_HP_BONUS
    } else {
        0
    };
    DEFAULT_HP
        .saturating_add(level_bonus)
        .saturating_add(upgrade_bonus(player, config, UPGRADE_HP))
        .saturating_add(achievement_bonus(player, config).0)
        .saturating_add(cap_bonus)
}

/// Damage per correct answer.
#[must_use]
pub fn damage(player: &Player, config: &GameConfig) -> u32 {
    let levels = &config.levels;
    let level_bonus =
        (player.level / levels.damage_level_interval.max(1)).saturating_mul(levels.damage_per_levels);
    let cap_bonus = if at_max_level(player, config) {
        MAX_LEVEL_DAMAGE_BONUS
    } else {
        0
    };
    DEFAULT_DAMAGE
        .saturating_add(level_bonus)
        .saturating_add(upgrade_bonus(player, config, UPGRADE_DAMAGE))
        .saturating_add(achievement_bonus(player, config).1)
        .saturating_add(cap_bonus)
}

/// Run timer for a difficulty tier.
#[must_use]
pub fn time_limit(player: &Player, config: &GameConfig, difficulty: u8) -> u32 {
    let base = match difficulty {
        0 | 1 => TIME_BASE_EASY,
        2 => TIME_BASE_NORMAL,
        _ => TIME_BASE_HARD,
    };
    let levels = &config.levels;
    let level_bonus =
        (player.level / levels.time_level_interval.max(1)).saturating_mul(levels.time_per_levels);
    let cap_bonus = if at_max_level(player, config) {
        MAX_LEVEL_TIME_BONUS
    } else {
        0
    };
    base.saturating_add(level_bonus)
        .saturating_add(upgrade_bonus(player, config, UPGRADE_TIME))
        .saturating_add(cap_bonus)
}

#[derive(Debug, Clone, Copy)]
struct StatLine {
    max_hp: u32,
    damage: u32,
    time: u32,
}

impl StatLine {
    fn of(player: &Player, config: &GameConfig) -> Self {
        Self {
            max_hp: max_hp(player, config),
            damage: damage(player, config),
            time: time_limit(player, config, REFERENCE_DIFFICULTY),
        }
    }

    fn bonus_message(self, after: Self) -> String {
        let parts: Vec<String> = [
            (MSG_LEVEL_BONUS_HP, after.max_hp.saturating_sub(self.max_hp)),
            (MSG_LEVEL_BONUS_DAMAGE, after.damage.saturating_sub(self.damage)),
            (MSG_LEVEL_BONUS_TIME, after.time.saturating_sub(self.time)),
        ]
        .into_iter()
        .filter(|(_, gain)| *gain > 0)
        .map(|(key, gain)| format!("{key} +{gain}"))
        .collect();
        parts.join(", ")
    }
}

/// Single owner of the player record.
///
/// Economy, reward and run functions borrow this handle and persist through
/// [`ProgressionEngine::save`], so the debounce covers every mutation.
pub struct ProgressionEngine<S, R>
where
    S: RecordStore,
    R: RemoteSession,
{
    store: S,
    remote: R,
    config: Rc<GameConfig>,
    player: Player,
    run: Option<RunState>,
    timers: TimerQueue<Deferred>,
    pending_sync: Option<TimerId>,
    rng: RngBundle,
    feedback: Vec<Feedback>,
    epoch_ms: u64,
    notice_seq: u64,
    migration: MigrationReport,
}

impl<S, R> ProgressionEngine<S, R>
where
    S: RecordStore,
    R: RemoteSession,
{
    /// Load the player record, creating or migrating it as needed.
    ///
    /// The player always enters at full health.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, the stored record is
    /// not a player record, or a created/migrated record cannot be written.
    pub fn load(
        store: S,
        remote: R,
        config: GameConfig,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let stored = store
            .get(Collection::Player, PLAYER_KEY)
            .map_err(EngineError::store)?;
        let (player, migration, created) = match stored {
            Some(value) => {
                let stored: StoredPlayer = serde_json::from_value(value)?;
                let (mut player, mut report) = stored.normalize();
                let cap = config.levels.max_level.max(STARTING_LEVEL);
                if player.level > cap {
                    log::debug!("stored level {} capped at {cap}", player.level);
                    player.level = cap;
                    player.exp = 0;
                    report.level_capped = true;
                }
                (player, report, false)
            }
            None => {
                let id = format!("{:016x}", derive_stream_seed(options.seed, b"identity"));
                (
                    Player::new(id, options.epoch_ms),
                    MigrationReport::default(),
                    true,
                )
            }
        };

        let mut engine = Self {
            store,
            remote,
            config: Rc::new(config),
            player,
            run: None,
            timers: TimerQueue::new(),
            pending_sync: None,
            rng: RngBundle::from_user_seed(options.seed),
            feedback: Vec::new(),
            epoch_ms: options.epoch_ms,
            notice_seq: 0,
            migration,
        };
        engine.player.max_hp = max_hp(&engine.player, &engine.config);
        engine.player.current_hp = engine.player.max_hp;

        if created || !migration.is_clean() {
            log::debug!("persisting player record (created: {created}, migration: {migration:?})");
            engine.write_local()?;
        }
        if migration.cosmetics_synthesized {
            engine.push_remote("cosmetics migration");
        }
        Ok(engine)
    }

    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    pub(crate) const fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Shared handle to the configuration, for callers that need it while
    /// mutably borrowing the engine.
    #[must_use]
    pub fn shared_config(&self) -> Rc<GameConfig> {
        Rc::clone(&self.config)
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Repairs applied when the record was loaded.
    #[must_use]
    pub const fn migration(&self) -> MigrationReport {
        self.migration
    }

    #[must_use]
    pub const fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub(crate) const fn run_mut(&mut self) -> Option<&mut RunState> {
        self.run.as_mut()
    }

    pub(crate) fn replace_run(&mut self, run: Option<RunState>) -> Option<RunState> {
        std::mem::replace(&mut self.run, run)
    }

    pub(crate) const fn rng(&mut self) -> &mut RngBundle {
        &mut self.rng
    }

    /// Wall-clock milliseconds according to the virtual clock.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.epoch_ms.saturating_add(self.timers.now())
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub const fn remote_sync_pending(&self) -> bool {
        self.pending_sync.is_some()
    }

    pub(crate) fn emit(&mut self, feedback: Feedback) {
        self.feedback.push(feedback);
    }

    /// Take every queued side-effect request.
    pub fn drain_feedback(&mut self) -> Vec<Feedback> {
        std::mem::take(&mut self.feedback)
    }

    pub(crate) fn schedule(&mut self, delay_ms: u64, task: Deferred) -> TimerId {
        self.timers.schedule(delay_ms, task)
    }

    pub(crate) const fn next_notice_token(&mut self) -> u64 {
        self.notice_seq = self.notice_seq.wrapping_add(1);
        self.notice_seq
    }

    #[must_use]
    pub fn max_hp(&self) -> u32 {
        max_hp(&self.player, &self.config)
    }

    #[must_use]
    pub fn damage(&self) -> u32 {
        damage(&self.player, &self.config)
    }

    #[must_use]
    pub fn time_limit(&self, difficulty: u8) -> u32 {
        time_limit(&self.player, &self.config, difficulty)
    }

    /// Recompute `max_hp`, carrying any increase over to current hp.
    pub(crate) fn refresh_max_hp(&mut self) {
        let before = self.player.max_hp;
        let after = self.max_hp();
        let gain = after.saturating_sub(before);
        self.player.max_hp = after;
        self.player.current_hp = self.player.current_hp.saturating_add(gain).min(after);
    }

    /// Heal by `amount`, clamped to max hp. Returns the hp actually restored.
    pub(crate) fn heal(&mut self, amount: u32) -> u32 {
        let before = self.player.current_hp;
        self.player.current_hp = before.saturating_add(amount).min(self.player.max_hp);
        self.player.current_hp - before
    }

    /// Add experience, leveling up as many times as it covers.
    ///
    /// Each level crossed carries the max-hp gain over to current hp and
    /// queues its own level-up announcement. Experience past the level cap
    /// is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the player record cannot be saved.
    pub fn gain_exp(&mut self, amount: u64) -> Result<ExpOutcome, EngineError> {
        let config = Rc::clone(&self.config);
        let max_level = config.levels.max_level;
        if self.player.level >= max_level {
            return Ok(ExpOutcome::default());
        }

        self.player.exp = self.player.exp.saturating_add(amount);
        let mut outcome = ExpOutcome::default();
        while self.player.level < max_level {
            let needed = config.levels.exp_for_level(self.player.level);
            if self.player.exp < needed {
                break;
            }
            self.player.exp -= needed;

            let before = StatLine::of(&self.player, &config);
            self.player.level += 1;
            let after = StatLine::of(&self.player, &config);
            let gain = after.max_hp.saturating_sub(before.max_hp);
            self.player.max_hp = after.max_hp;
            self.player.current_hp = self
                .player
                .current_hp
                .saturating_add(gain)
                .min(after.max_hp);

            let level = self.player.level;
            let message = if level == max_level {
                MSG_MAX_LEVEL.to_string()
            } else {
                before.bonus_message(after)
            };
            log::debug!("level up: {level} ({message})");
            self.emit(Feedback::LevelUp { level, message });
            self.emit(Feedback::sound(SoundCue::LevelUp));
            outcome.levels_gained.push(level);
        }
        if self.player.level >= max_level {
            self.player.exp = 0;
        }

        self.save()?;
        Ok(outcome)
    }

    /// Record an unlocked achievement. Returns `false` if it was already held.
    ///
    /// # Errors
    ///
    /// Returns an error if the player record cannot be saved.
    pub fn grant_achievement(&mut self, id: &str) -> Result<bool, EngineError> {
        if self.player.has_achievement(id) {
            return Ok(false);
        }
        self.player.achievements.push(id.to_string());
        self.refresh_max_hp();
        self.save()?;
        Ok(true)
    }

    /// Persist the record locally and debounce a remote push.
    ///
    /// The local write happens before this returns; a burst of saves inside
    /// the debounce window collapses into one remote push.
    ///
    /// # Errors
    ///
    /// Returns an error if the local write fails.
    pub fn save(&mut self) -> Result<(), EngineError> {
        self.write_local()?;
        if self.remote.is_logged_in() {
            if let Some(previous) = self.pending_sync.take() {
                self.timers.cancel(previous);
            }
            self.pending_sync = Some(
                self.timers
                    .schedule(REMOTE_SYNC_DEBOUNCE_MS, Deferred::RemoteSync),
            );
        }
        Ok(())
    }

    fn write_local(&self) -> Result<(), EngineError> {
        put_record(&self.store, Collection::Player, PLAYER_KEY, &self.player)
    }

    fn push_remote(&self, reason: &str) {
        if !self.remote.is_logged_in() {
            return;
        }
        match self.remote.put_player(&self.player) {
            Ok(()) => log::debug!("remote sync ({reason}) complete"),
            Err(err) => log::warn!("remote sync ({reason}) failed: {err}"),
        }
    }

    /// Advance the virtual clock, running every deferred task that falls due.
    ///
    /// # Errors
    ///
    /// Returns an error if a deferred effect needs to save and the local
    /// write fails. Remote failures are logged, never returned.
    pub fn advance(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
        let target = self.timers.now().saturating_add(elapsed_ms);
        while let Some(task) = self.timers.pop_due(target) {
            self.run_deferred(task)?;
        }
        self.timers.advance_to(target);
        Ok(())
    }

    fn run_deferred(&mut self, task: Deferred) -> Result<(), EngineError> {
        match task {
            Deferred::RemoteSync => {
                self.pending_sync = None;
                self.push_remote("debounced");
            }
            Deferred::BonusDrop(roll) => {
                log::debug!("bonus drop landing: {}", roll.item_id);
                reward::on_item_drop(self, &roll)?;
            }
            Deferred::ClearNotice { token } => {
                if let Some(run) = self.run.as_mut()
                    && run.notice.as_ref().is_some_and(|notice| notice.token == token)
                {
                    run.notice = None;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelConfig;
    use crate::player::Cosmetics;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::cell::RefCell;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("backup service unavailable")]
    struct BackupDown;

    #[derive(Debug, Default)]
    struct RecordingRemote {
        logged_in: bool,
        failing: bool,
        pushes: RefCell<Vec<u32>>,
    }

    impl RemoteSession for &RecordingRemote {
        type Error = BackupDown;

        fn is_logged_in(&self) -> bool {
            self.logged_in
        }

        fn put_player(&self, player: &Player) -> Result<(), Self::Error> {
            self.pushes.borrow_mut().push(player.level);
            if self.failing { Err(BackupDown) } else { Ok(()) }
        }
    }

    fn test_config() -> GameConfig {
        let mut config = GameConfig::bundled();
        config.levels = LevelConfig {
            max_level: 5,
            hp_per_level: 10,
            damage_level_interval: 2,
            damage_per_levels: 1,
            time_level_interval: 2,
            time_per_levels: 5,
            exp_base: 100,
            exp_growth: 1.0,
        };
        config
    }

    fn engine_with(
        remote: &RecordingRemote,
    ) -> ProgressionEngine<MemoryStore, &RecordingRemote> {
        ProgressionEngine::load(
            MemoryStore::new(),
            remote,
            test_config(),
            EngineOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn new_player_is_created_and_persisted() {
        let remote = RecordingRemote::default();
        let engine = engine_with(&remote);
        let player = engine.player();
        assert_eq!(player.level, 1);
        assert_eq!(player.gold, 100);
        assert_eq!(player.max_hp, 100);
        assert_eq!(player.current_hp, player.max_hp);
        assert_eq!(engine.store().len(Collection::Player), 1);
    }

    #[test]
    fn load_heals_and_migrates_legacy_records() {
        let store = MemoryStore::new();
        store
            .put(
                Collection::Player,
                PLAYER_KEY,
                &json!({"id":"main","level":3,"gold":40,"currentHp":1,
                        "permanentUpgrades":{"hp":2}}),
            )
            .unwrap();
        let remote = RecordingRemote {
            logged_in: true,
            failing: true,
            ..RecordingRemote::default()
        };
        let engine =
            ProgressionEngine::load(store.clone(), &remote, test_config(), EngineOptions::default())
                .unwrap();

        // 100 base + 2 levels * 10 + 2 upgrades * 10
        assert_eq!(engine.player().max_hp, 140);
        assert_eq!(engine.player().current_hp, 140);
        assert_eq!(engine.player().cosmetics, Cosmetics::default());
        assert!(engine.migration().cosmetics_synthesized);
        // immediate re-sync attempted once, failure swallowed
        assert_eq!(remote.pushes.borrow().len(), 1);
        assert!(!engine.remote_sync_pending());

        let saved = store.get(Collection::Player, PLAYER_KEY).unwrap().unwrap();
        assert!(saved.get("cosmetics").is_some());
        assert!(saved.get("inventory").is_some());
    }

    #[test]
    fn stored_levels_above_the_cap_are_clamped_on_load() {
        let store = MemoryStore::new();
        store
            .put(
                Collection::Player,
                PLAYER_KEY,
                &json!({"id":"main","level":12,"exp":70,"inventory":{},
                        "cosmetics":Cosmetics::default()}),
            )
            .unwrap();
        let remote = RecordingRemote::default();
        let engine =
            ProgressionEngine::load(store.clone(), &remote, test_config(), EngineOptions::default())
                .unwrap();

        assert_eq!(engine.player().level, 5);
        assert_eq!(engine.player().exp, 0);
        assert!(engine.migration().level_capped);
        // 100 base + 4 levels * 10 + max-level flat 10
        assert_eq!(engine.player().max_hp, 150);

        let saved = store.get(Collection::Player, PLAYER_KEY).unwrap().unwrap();
        assert_eq!(saved["level"], 5);
    }

    #[test]
    fn derived_totals_follow_formulas() {
        let config = test_config();
        let mut player = Player::new("p", 0);
        player.level = 4;
        player.permanent_upgrades.insert("damage".into(), 3);
        player.permanent_upgrades.insert("time".into(), 2);
        assert_eq!(max_hp(&player, &config), 130);
        // 10 + (4/2)*1 + 3*2
        assert_eq!(damage(&player, &config), 18);
        // 160 + (4/2)*5 + 2*5
        assert_eq!(time_limit(&player, &config, 3), 180);
        assert_eq!(time_limit(&player, &config, 1), 80);
        assert_eq!(time_limit(&player, &config, 2), 120);

        player.level = 5;
        // 100 + 40 + 10 flat
        assert_eq!(max_hp(&player, &config), 150);
        assert_eq!(damage(&player, &config), 10 + 2 + 6 + 10);
        assert_eq!(time_limit(&player, &config, 2), 100 + 10 + 10 + 15);
    }

    #[test]
    fn achievements_feed_derived_totals() {
        let remote = RecordingRemote::default();
        let mut engine = engine_with(&remote);
        assert!(engine.grant_achievement("scholar").unwrap());
        assert!(!engine.grant_achievement("scholar").unwrap());
        assert_eq!(engine.player().max_hp, 110);
        assert_eq!(engine.player().current_hp, 110);
        assert_eq!(engine.damage(), 11);
    }

    #[test]
    fn gain_exp_crosses_multiple_levels_with_one_event_each() {
        let remote = RecordingRemote::default();
        let mut engine = engine_with(&remote);
        engine.player_mut().current_hp = 50;

        let outcome = engine.gain_exp(250).unwrap();
        assert_eq!(outcome.levels_gained, vec![2, 3]);
        assert_eq!(engine.player().level, 3);
        assert_eq!(engine.player().exp, 50);
        assert_eq!(engine.player().max_hp, 120);
        // mid-run damage carries across level-ups
        assert_eq!(engine.player().current_hp, 70);

        let level_ups: Vec<_> = engine
            .drain_feedback()
            .into_iter()
            .filter(|fb| matches!(fb, Feedback::LevelUp { .. }))
            .collect();
        assert_eq!(level_ups.len(), 2);
    }

    #[test]
    fn gain_exp_discards_overflow_at_cap_and_uses_max_message() {
        let remote = RecordingRemote::default();
        let mut engine = engine_with(&remote);
        let outcome = engine.gain_exp(10_000).unwrap();
        assert_eq!(outcome.levels_gained, vec![2, 3, 4, 5]);
        assert_eq!(engine.player().level, 5);
        assert_eq!(engine.player().exp, 0);
        let last = engine
            .drain_feedback()
            .into_iter()
            .filter_map(|fb| match fb {
                Feedback::LevelUp { level, message } => Some((level, message)),
                _ => None,
            })
            .last();
        assert_eq!(last, Some((5, MSG_MAX_LEVEL.to_string())));

        let again = engine.gain_exp(500).unwrap();
        assert!(!again.leveled_up());
        assert_eq!(engine.player().exp, 0);
    }

    #[test]
    fn saves_debounce_remote_pushes() {
        let remote = RecordingRemote {
            logged_in: true,
            ..RecordingRemote::default()
        };
        let mut engine = engine_with(&remote);
        for _ in 0..5 {
            engine.save().unwrap();
            engine.advance(300).unwrap();
        }
        assert!(remote.pushes.borrow().is_empty());
        assert_eq!(engine.pending_timers(), 1);

        engine.advance(1_000).unwrap();
        assert_eq!(remote.pushes.borrow().len(), 1);
        assert!(!engine.remote_sync_pending());
    }

    #[test]
    fn remote_failures_never_surface() {
        let remote = RecordingRemote {
            logged_in: true,
            failing: true,
            ..RecordingRemote::default()
        };
        let mut engine = engine_with(&remote);
        engine.save().unwrap();
        assert!(engine.advance(2_000).is_ok());
        assert_eq!(remote.pushes.borrow().len(), 1);
    }

    #[test]
    fn offline_saves_schedule_nothing() {
        let remote = RecordingRemote::default();
        let mut engine = engine_with(&remote);
        engine.save().unwrap();
        assert_eq!(engine.pending_timers(), 0);
    }

    #[test]
    fn local_write_failures_propagate() {
        let remote = RecordingRemote::default();
        let store = MemoryStore::new();
        let mut engine =
            ProgressionEngine::load(store.clone(), &remote, test_config(), EngineOptions::default())
                .unwrap();
        store.reject_writes(true);
        assert!(matches!(engine.gain_exp(10), Err(EngineError::Store(_))));
    }

    #[test]
    fn max_hp_is_monotonic_in_level_and_upgrades() {
        let config = test_config();
        let mut previous_row = 0;
        for level in 1..=config.levels.max_level {
            let mut previous = 0;
            for upgrades in 0..=20 {
                let mut player = Player::new("p", 0);
                player.level = level;
                player.permanent_upgrades.insert("hp".into(), upgrades);
                let hp = max_hp(&player, &config);
                assert!(hp >= previous);
                previous = hp;
                if upgrades == 0 {
                    assert!(hp >= previous_row);
                    previous_row = hp;
                }
            }
        }
    }
}
