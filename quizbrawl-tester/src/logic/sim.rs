use anyhow::{Result, ensure};
use quizbrawl_game::{
    AnswerOutcome, MonsterClass, ProgressionEngine, PurchaseOutcome, RecordStore,
    RemoteSession, RunEnd, RunRecord, answer, buy_item, buy_upgrade, defeat_monster, finish_run,
    max_hp, start_run, upgrade_catalog, use_revive,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

const SUBJECTS: [&str; 4] = ["math", "history", "science", "language"];
const MS_PER_ANSWER: u64 = 4_000;

/// How a simulated player behaves.
#[derive(Debug, Clone, Copy)]
pub struct PlayStyle {
    /// Chance of answering any question correctly.
    pub accuracy: f64,
    pub questions_per_monster: u32,
    pub monsters_per_run: u32,
    /// Spend on upgrades between runs.
    pub shops: bool,
}

impl Default for PlayStyle {
    fn default() -> Self {
        Self {
            accuracy: 0.75,
            questions_per_monster: 3,
            monsters_per_run: 6,
            shops: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub runs: u32,
    pub clears: u32,
    pub fails: u32,
    pub levels_gained: u32,
    pub purchases: u32,
    pub gold_spent: u64,
    pub drops: u32,
    pub revives: u32,
}

/// Deterministic stand-in for a human player.
pub struct SimulatedPlayer {
    rng: ChaCha8Rng,
    style: PlayStyle,
    summary: SessionSummary,
}

impl SimulatedPlayer {
    pub fn new(seed: u64, style: PlayStyle) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            style,
            summary: SessionSummary::default(),
        }
    }

    pub const fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    fn class_for(&self, index: u32) -> MonsterClass {
        let last = self.style.monsters_per_run.saturating_sub(1);
        if index == last {
            MonsterClass::FinalBoss
        } else if index * 2 == last {
            MonsterClass::MidBoss
        } else if index % 3 == 2 {
            MonsterClass::Boss
        } else {
            MonsterClass::Trash
        }
    }

    /// Play one run to completion and return its history record.
    pub fn play_run<S, R>(
        &mut self,
        engine: &mut ProgressionEngine<S, R>,
        difficulty: u8,
    ) -> Result<RunRecord>
    where
        S: RecordStore,
        R: RemoteSession,
    {
        start_run(engine, difficulty)?;
        let mut failed = false;
        'monsters: for index in 0..self.style.monsters_per_run {
            for _ in 0..self.style.questions_per_monster {
                let subject = SUBJECTS[self.rng.gen_range(0..SUBJECTS.len())];
                let correct = self.rng.gen_bool(self.style.accuracy.clamp(0.0, 1.0));
                let outcome = answer(engine, correct, subject)?;
                engine.advance(MS_PER_ANSWER)?;
                check_vitals(engine)?;
                match outcome {
                    AnswerOutcome::Correct { exp, .. } => {
                        self.summary.levels_gained += u32::try_from(exp.levels_gained.len())?;
                    }
                    AnswerOutcome::Wrong { hp_left: 0 } => {
                        if use_revive(engine)? {
                            self.summary.revives += 1;
                        } else {
                            failed = true;
                            break 'monsters;
                        }
                    }
                    AnswerOutcome::Wrong { .. } | AnswerOutcome::Ignored => {}
                }
            }
            let class = self.class_for(index);
            let defeat = defeat_monster(engine, &format!("monster-{index}"), class)?;
            if defeat.drop.dropped() {
                self.summary.drops += 1;
            }
        }

        // let deferred bonus drops and notices land before closing
        engine.advance(MS_PER_ANSWER)?;
        let end = if failed { RunEnd::Failed } else { RunEnd::Clear };
        let record = finish_run(engine, end)?
            .ok_or_else(|| anyhow::anyhow!("run closed before it finished"))?;
        self.summary.runs += 1;
        if failed {
            self.summary.fails += 1;
        } else {
            self.summary.clears += 1;
        }
        Ok(record)
    }

    /// Buy the cheapest affordable upgrade until nothing is affordable, then
    /// stock a revive ticket if gold allows.
    pub fn shop<S, R>(&mut self, engine: &mut ProgressionEngine<S, R>) -> Result<()>
    where
        S: RecordStore,
        R: RemoteSession,
    {
        if !self.style.shops {
            return Ok(());
        }
        loop {
            let cheapest = upgrade_catalog(engine.player(), engine.config())
                .into_iter()
                .filter(|row| row.affordable)
                .min_by_key(|row| row.next_price);
            let Some(row) = cheapest else { break };
            let gold_before = engine.player().gold;
            match buy_upgrade(engine, &row.id)? {
                PurchaseOutcome::Purchased { price } => {
                    ensure!(
                        engine.player().gold == gold_before - price,
                        "upgrade {} debited the wrong amount",
                        row.id
                    );
                    self.summary.purchases += 1;
                    self.summary.gold_spent += price;
                }
                other => anyhow::bail!("listed upgrade {} refused: {other:?}", row.id),
            }
            check_vitals(engine)?;
        }
        if self.rng.gen_bool(0.5)
            && let PurchaseOutcome::Purchased { price } = buy_item(engine, "reviveTicket")?
        {
            self.summary.purchases += 1;
            self.summary.gold_spent += price;
        }
        Ok(())
    }
}

/// Vitals invariants that must hold after every engine call.
pub fn check_vitals<S, R>(engine: &ProgressionEngine<S, R>) -> Result<()>
where
    S: RecordStore,
    R: RemoteSession,
{
    let player = engine.player();
    ensure!(
        player.current_hp <= player.max_hp,
        "current hp {} exceeds max hp {}",
        player.current_hp,
        player.max_hp
    );
    let expected = max_hp(player, engine.config());
    ensure!(
        player.max_hp == expected,
        "stored max hp {} drifted from derived {expected}",
        player.max_hp
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizbrawl_game::{EngineOptions, GameConfig, MemoryStore, Offline};

    fn engine() -> ProgressionEngine<MemoryStore, Offline> {
        ProgressionEngine::load(
            MemoryStore::new(),
            Offline,
            GameConfig::bundled(),
            EngineOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn summary_tracks_levels_and_spending() {
        let mut engine = engine();
        let mut sim = SimulatedPlayer::new(
            9,
            PlayStyle {
                accuracy: 1.0,
                ..PlayStyle::default()
            },
        );
        for _ in 0..3 {
            sim.play_run(&mut engine, 2).unwrap();
            sim.shop(&mut engine).unwrap();
        }

        let summary = sim.summary();
        let player = engine.player();
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.clears, 3);
        assert_eq!(summary.revives, 0);
        assert_eq!(player.level, 1 + summary.levels_gained);
        assert!(summary.levels_gained > 0);
        assert_eq!(
            player.gold + summary.gold_spent,
            100 + player.total_gold_earned
        );
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["drops"], summary.drops);
    }
}
