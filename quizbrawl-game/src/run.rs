//! In-run state and the run lifecycle: answers, kills and the final record.
use serde::{Deserialize, Serialize};

use crate::analytics::RunRecord;
use crate::config::{CosmeticCategory, DropEffect, MonsterClass};
use crate::constants::{REVIVE_TICKET_ID, UPGRADE_GOLD_BONUS};
use crate::feedback::{DropNotice, Feedback, SoundCue, VisualFx};
use crate::numbers::{round_f64_to_u64, u64_to_f64};
use crate::progression::{ExpOutcome, ProgressionEngine};
use crate::reward::{DropOutcome, check_drop};
use crate::storage::{Collection, EngineError, RecordStore, RemoteSession, put_record};

/// Ephemeral state of the run in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub difficulty: u8,
    pub started_at: u64,
    /// Remaining seconds on the run timer.
    pub timer: u32,
    pub combo: u32,
    pub best_combo: u32,
    pub total_answers: u32,
    pub correct_answers: u32,
    pub earned_gold: u64,
    pub free_hints: u32,
    pub gold_multiplier: f64,
    pub time_stop_charges: u32,
    pub defeated_monsters: Vec<String>,
    /// Drop notification currently on screen.
    pub notice: Option<DropNotice>,
}

impl RunState {
    #[must_use]
    pub const fn new(difficulty: u8, started_at: u64, timer: u32) -> Self {
        Self {
            difficulty,
            started_at,
            timer,
            combo: 0,
            best_combo: 0,
            total_answers: 0,
            correct_answers: 0,
            earned_gold: 0,
            free_hints: 0,
            gold_multiplier: 1.0,
            time_stop_charges: 0,
            defeated_monsters: Vec::new(),
            notice: None,
        }
    }

    fn add_combo(&mut self, amount: u32) {
        self.combo = self.combo.saturating_add(amount);
        self.best_combo = self.best_combo.max(self.combo);
    }

    /// Apply the run-scoped part of a drop effect.
    pub(crate) fn apply_effect(&mut self, effect: DropEffect) {
        match effect {
            DropEffect::Time(seconds) | DropEffect::AllTime(seconds) => {
                self.timer = self.timer.saturating_add(seconds);
            }
            DropEffect::Combo(amount) => self.add_combo(amount),
            DropEffect::FreeHint(count) => self.free_hints = self.free_hints.saturating_add(count),
            DropEffect::GoldMulti(factor) => {
                if factor.is_finite() && factor > 0.0 {
                    self.gold_multiplier *= factor;
                }
            }
            DropEffect::TimeStop(count) => {
                self.time_stop_charges = self.time_stop_charges.saturating_add(count);
            }
            DropEffect::Hp(_) | DropEffect::Gold(_) | DropEffect::Revive(_) => {}
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunEnd {
    Clear,
    Failed,
    Abandoned,
}

impl RunEnd {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// No run was active.
    Ignored,
    Correct { combo: u32, exp: ExpOutcome },
    Wrong { hp_left: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefeatOutcome {
    pub gold: u64,
    pub drop: DropOutcome,
}

/// Open a run at `difficulty`, abandoning any run still in progress. The
/// player enters at full health.
///
/// # Errors
///
/// Returns an error if an abandoned run cannot be recorded.
pub fn start_run<S, R>(engine: &mut ProgressionEngine<S, R>, difficulty: u8) -> Result<(), EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    if engine.run().is_some() {
        log::debug!("abandoning unfinished run");
        finish_run(engine, RunEnd::Abandoned)?;
    }
    let difficulty = difficulty.clamp(1, 3);
    let player = engine.player_mut();
    player.current_hp = player.max_hp;
    let run = RunState::new(difficulty, engine.now_ms(), engine.time_limit(difficulty));
    engine.replace_run(Some(run));
    Ok(())
}

/// Record an answer to the current question.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn answer<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    correct: bool,
    subject: &str,
) -> Result<AnswerOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let Some(run) = engine.run_mut() else {
        log::debug!("answer ignored outside a run");
        return Ok(AnswerOutcome::Ignored);
    };
    run.total_answers = run.total_answers.saturating_add(1);

    if correct {
        run.correct_answers = run.correct_answers.saturating_add(1);
        run.add_combo(1);
        let combo = run.combo;

        let player = engine.player_mut();
        player.total_correct_answers = player.total_correct_answers.saturating_add(1);
        let count = player.subject_counts.entry(subject.to_string()).or_insert(0);
        *count = count.saturating_add(1);

        engine.emit(Feedback::sound(SoundCue::Correct));
        engine.emit(Feedback::visual(VisualFx::CorrectFlash));
        let exp_amount = engine.config().answers.exp_per_correct;
        let exp = engine.gain_exp(exp_amount)?;
        Ok(AnswerOutcome::Correct { combo, exp })
    } else {
        run.combo = 0;
        let penalty = engine.config().answers.wrong_answer_damage;
        let player = engine.player_mut();
        player.current_hp = player.current_hp.saturating_sub(penalty);
        let hp_left = player.current_hp;
        engine.emit(Feedback::sound(SoundCue::Wrong));
        engine.save()?;
        Ok(AnswerOutcome::Wrong { hp_left })
    }
}

/// Gold awarded for a kill: class reward scaled by the run multiplier and
/// the gold bonus upgrade.
fn kill_gold<S, R>(engine: &ProgressionEngine<S, R>, class: MonsterClass) -> u64
where
    S: RecordStore,
    R: RemoteSession,
{
    let config = engine.config();
    let base = config.kill_gold.for_class(class);
    let multiplier = engine.run().map_or(1.0, |run| run.gold_multiplier);
    let bonus_percent = config.upgrade(UPGRADE_GOLD_BONUS).map_or(0, |def| {
        engine.player().upgrade_level(UPGRADE_GOLD_BONUS).saturating_mul(def.value)
    });
    let scale = 1.0 + f64::from(bonus_percent) / 100.0;
    round_f64_to_u64(u64_to_f64(base) * multiplier * scale)
}

/// Credit a defeated monster and roll for its drop.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn defeat_monster<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    name: &str,
    class: MonsterClass,
) -> Result<DefeatOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let gold = kill_gold(engine, class);
    let player = engine.player_mut();
    player.stats.total_kills = player.stats.total_kills.saturating_add(1);
    player.gold = player.gold.saturating_add(gold);
    player.total_gold_earned = player.total_gold_earned.saturating_add(gold);
    if let Some(run) = engine.run_mut() {
        run.earned_gold = run.earned_gold.saturating_add(gold);
        run.defeated_monsters.push(name.to_string());
    }
    if gold > 0 {
        engine.emit(Feedback::visual(VisualFx::FloatingText {
            text: format!("+{gold}G"),
        }));
    }
    engine.emit(Feedback::visual(VisualFx::Particles {
        category: Some(CosmeticCategory::Particle),
    }));
    engine.save()?;

    let drop = check_drop(engine, class)?;
    Ok(DefeatOutcome { gold, drop })
}

/// Close the current run, append its record to history and update lifetime stats.
///
/// Returns `None` if no run was active.
///
/// # Errors
///
/// Returns an error if the run record or player record cannot be written.
pub fn finish_run<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    end: RunEnd,
) -> Result<Option<RunRecord>, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let Some(run) = engine.run() else {
        return Ok(None);
    };
    let sequence = engine.player().stats.total_runs;
    let record = RunRecord {
        id: format!("{}-{sequence}", run.started_at),
        start_time: Some(run.started_at),
        end_time: Some(engine.now_ms()),
        result: end.as_str().to_string(),
        difficulty: Some(run.difficulty),
        total_answers: run.total_answers,
        correct_answers: run.correct_answers,
        best_combo: run.best_combo,
        earned_gold: run.earned_gold,
        defeated_monsters: run.defeated_monsters.clone(),
    };
    // the run stays open until its record is durable
    put_record(engine.store(), Collection::Runs, &record.id, &record)?;
    engine.replace_run(None);

    let stats = &mut engine.player_mut().stats;
    stats.total_runs = stats.total_runs.saturating_add(1);
    if end == RunEnd::Clear {
        stats.total_clears = stats.total_clears.saturating_add(1);
    }
    stats.best_combo = stats.best_combo.max(record.best_combo);
    log::debug!("run {} finished: {}", record.id, record.result);

    engine.save()?;
    engine.emit(Feedback::AchievementRecheck);
    Ok(Some(record))
}

/// Spend one revive ticket to restore full health.
///
/// Returns `false` without changes when no ticket is held.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn use_revive<S, R>(engine: &mut ProgressionEngine<S, R>) -> Result<bool, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let player = engine.player_mut();
    let Some(tickets) = player.inventory.get_mut(REVIVE_TICKET_ID).filter(|n| **n > 0) else {
        return Ok(false);
    };
    *tickets -= 1;
    player.current_hp = player.max_hp;
    engine.emit(Feedback::sound(SoundCue::Revive));
    engine.save()?;
    Ok(true)
}

/// Spend a free hint earned this run.
pub fn use_free_hint<S, R>(engine: &mut ProgressionEngine<S, R>) -> bool
where
    S: RecordStore,
    R: RemoteSession,
{
    match engine.run_mut() {
        Some(run) if run.free_hints > 0 => {
            run.free_hints -= 1;
            true
        }
        _ => false,
    }
}

/// Count down the run timer. A held time-stop charge absorbs the tick instead.
///
/// Returns the seconds left, or `None` outside a run.
pub fn tick_timer<S, R>(engine: &mut ProgressionEngine<S, R>, seconds: u32) -> Option<u32>
where
    S: RecordStore,
    R: RemoteSession,
{
    let run = engine.run_mut()?;
    if run.time_stop_charges > 0 {
        run.time_stop_charges -= 1;
    } else {
        run.timer = run.timer.saturating_sub(seconds);
    }
    Some(run.timer)
}
