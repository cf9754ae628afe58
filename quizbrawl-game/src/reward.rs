//! Item drops: trigger chances, rarity selection and effect application.
use rand::Rng;
use serde::Serialize;

use crate::config::{DropEffect, MonsterClass, Rarity, RarityTable};
use crate::constants::{
    BONUS_DROP_DELAY_MS, DROP_NOTICE_DURATION_MS, FINAL_BOSS_BONUS_CHANCE, REVIVE_TICKET_ID,
};
use crate::feedback::{DropNotice, Feedback, SoundCue};
use crate::progression::{Deferred, ProgressionEngine};
use crate::storage::{EngineError, RecordStore, RemoteSession};

/// A rolled item, consumed immediately into player and run mutations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRoll {
    pub rarity: Rarity,
    pub item_id: String,
    pub name: String,
    pub icon: String,
    pub effect: DropEffect,
}

/// Result of a drop check for one defeated monster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropOutcome {
    /// The roll applied immediately, if the drop fired.
    pub primary: Option<DropRoll>,
    /// A final-boss bonus roll was parked on the timer queue.
    pub bonus_scheduled: bool,
}

impl DropOutcome {
    #[must_use]
    pub const fn dropped(&self) -> bool {
        self.primary.is_some()
    }
}

/// Pick a rarity tier by cumulative probability, then an item uniformly
/// within that tier.
///
/// Returns `None` when the chosen tier has no items configured.
pub fn roll_item_drop<G>(table: &RarityTable, rng: &mut G) -> Option<DropRoll>
where
    G: Rng + ?Sized,
{
    let draw: f64 = rng.r#gen();
    let mut cumulative = 0.0;
    let mut rarity = Rarity::Normal;
    for candidate in Rarity::WEIGHTED {
        cumulative += table.tier(candidate).drop_rate;
        if draw < cumulative {
            rarity = candidate;
            break;
        }
    }

    let pool = &table.tier(rarity).items;
    if pool.is_empty() {
        log::debug!("no {} items configured; drop skipped", rarity.as_str());
        return None;
    }
    let item = &pool[rng.gen_range(0..pool.len())];
    Some(DropRoll {
        rarity,
        item_id: item.id.clone(),
        name: item.name.clone(),
        icon: item.icon.clone(),
        effect: item.effect,
    })
}

/// Roll for a drop from a defeated monster and apply it.
///
/// A final boss always drops; an independent coin flip then parks a bonus
/// roll that lands after a short delay.
///
/// # Errors
///
/// Returns an error if applying the drop requires a save and the local
/// write fails.
pub fn check_drop<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    class: MonsterClass,
) -> Result<DropOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let config = engine.shared_config();
    let chance = config.drop_rates.chance_for(class);
    let draw: f64 = engine.rng().drops().r#gen();
    if draw >= chance {
        return Ok(DropOutcome::default());
    }
    let Some(roll) = roll_item_drop(&config.rarities, engine.rng().item()) else {
        return Ok(DropOutcome::default());
    };
    on_item_drop(engine, &roll)?;

    let mut bonus_scheduled = false;
    if class == MonsterClass::FinalBoss {
        let bonus_draw: f64 = engine.rng().bonus().r#gen();
        if bonus_draw < FINAL_BOSS_BONUS_CHANCE
            && let Some(bonus) = roll_item_drop(&config.rarities, engine.rng().item())
        {
            log::debug!("final boss bonus drop queued: {}", bonus.item_id);
            engine.schedule(BONUS_DROP_DELAY_MS, Deferred::BonusDrop(bonus));
            bonus_scheduled = true;
        }
    }

    Ok(DropOutcome {
        primary: Some(roll),
        bonus_scheduled,
    })
}

/// Apply a rolled item's effect and announce it.
///
/// Run-scoped effects are dropped when no run is active. Only revive
/// tickets and gold are saved immediately.
///
/// # Errors
///
/// Returns an error if a forced save fails.
pub fn on_item_drop<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    roll: &DropRoll,
) -> Result<(), EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    log::debug!("applying {} drop {}", roll.rarity.as_str(), roll.item_id);
    let mut force_save = false;
    match roll.effect {
        DropEffect::Hp(amount) => {
            engine.heal(amount);
        }
        DropEffect::Revive(count) => {
            engine.player_mut().add_item(REVIVE_TICKET_ID, count);
            force_save = true;
        }
        DropEffect::Gold(amount) => {
            let player = engine.player_mut();
            player.gold = player.gold.saturating_add(amount);
            player.total_gold_earned = player.total_gold_earned.saturating_add(amount);
            if let Some(run) = engine.run_mut() {
                run.earned_gold = run.earned_gold.saturating_add(amount);
            }
            force_save = true;
        }
        effect => match engine.run_mut() {
            Some(run) => run.apply_effect(effect),
            None => log::debug!("{} drop ignored outside a run", roll.item_id),
        },
    }

    let token = engine.next_notice_token();
    let notice = DropNotice {
        token,
        item_id: roll.item_id.clone(),
        name: roll.name.clone(),
        icon: roll.icon.clone(),
        rarity: roll.rarity,
    };
    if let Some(run) = engine.run_mut() {
        run.notice = Some(notice.clone());
        engine.schedule(DROP_NOTICE_DURATION_MS, Deferred::ClearNotice { token });
    }
    engine.emit(Feedback::ItemDropped { notice });
    engine.emit(Feedback::sound(SoundCue::ItemDrop));

    if force_save {
        engine.save()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DropItemDef, GameConfig, RarityTier};
    use crate::progression::EngineOptions;
    use crate::run::start_run;
    use crate::storage::{MemoryStore, Offline};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn tier(rate: f64, id: &str, effect: DropEffect) -> RarityTier {
        RarityTier {
            drop_rate: rate,
            items: vec![DropItemDef {
                id: id.into(),
                name: id.into(),
                icon: String::new(),
                effect,
            }],
        }
    }

    fn single_tier_table(effect: DropEffect) -> RarityTable {
        RarityTable {
            normal: tier(0.0, "only", effect),
            ..RarityTable::default()
        }
    }

    fn engine() -> ProgressionEngine<MemoryStore, Offline> {
        ProgressionEngine::load(
            MemoryStore::new(),
            Offline,
            GameConfig::bundled(),
            EngineOptions {
                seed: 11,
                epoch_ms: 0,
            },
        )
        .unwrap()
    }

    #[test]
    fn rolled_items_come_from_their_tier() {
        let table = GameConfig::bundled().rarities;
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..2_000 {
            let roll = roll_item_drop(&table, &mut rng).unwrap();
            let pool = &table.tier(roll.rarity).items;
            assert!(pool.iter().any(|item| item.id == roll.item_id));
        }
    }

    #[test]
    fn zero_weight_tiers_fall_through_to_normal() {
        let table = single_tier_table(DropEffect::Hp(5));
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            assert_eq!(roll_item_drop(&table, &mut rng).unwrap().rarity, Rarity::Normal);
        }
    }

    #[test]
    fn empty_pool_yields_no_drop() {
        let table = RarityTable::default();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(roll_item_drop(&table, &mut rng).is_none());
    }

    #[test]
    fn final_boss_always_drops() {
        let mut engine = engine();
        for _ in 0..50 {
            let outcome = check_drop(&mut engine, MonsterClass::FinalBoss).unwrap();
            assert!(outcome.dropped());
        }
    }

    #[test]
    fn trash_never_drops_at_zero_rate() {
        let mut config = GameConfig::bundled();
        config.drop_rates.base = 0.0;
        let mut engine =
            ProgressionEngine::load(MemoryStore::new(), Offline, config, EngineOptions::default())
                .unwrap();
        for _ in 0..200 {
            assert!(!check_drop(&mut engine, MonsterClass::Trash).unwrap().dropped());
        }
        assert!(engine.drain_feedback().is_empty());
    }

    #[test]
    fn gold_and_revive_drops_persist_immediately() {
        let store = MemoryStore::new();
        let mut engine = ProgressionEngine::load(
            store.clone(),
            Offline,
            GameConfig::bundled(),
            EngineOptions::default(),
        )
        .unwrap();
        let roll = DropRoll {
            rarity: Rarity::Epic,
            item_id: "treasureChest".into(),
            name: String::new(),
            icon: String::new(),
            effect: DropEffect::Gold(150),
        };
        store.reject_writes(true);
        assert!(on_item_drop(&mut engine, &roll).is_err());
        store.reject_writes(false);

        on_item_drop(&mut engine, &roll).unwrap();
        let saved = store
            .get(crate::storage::Collection::Player, "main")
            .unwrap()
            .unwrap();
        assert_eq!(saved["gold"], 400);

        let revive = DropRoll {
            effect: DropEffect::Revive(1),
            ..roll
        };
        on_item_drop(&mut engine, &revive).unwrap();
        assert_eq!(engine.player().item_count(REVIVE_TICKET_ID), 1);
    }

    #[test]
    fn run_effects_land_on_the_active_run() {
        let mut engine = engine();
        start_run(&mut engine, 2).unwrap();
        let base_timer = engine.run().unwrap().timer;
        for effect in [
            DropEffect::Time(10),
            DropEffect::AllTime(5),
            DropEffect::Combo(3),
            DropEffect::FreeHint(1),
            DropEffect::GoldMulti(2.0),
            DropEffect::TimeStop(1),
        ] {
            let roll = DropRoll {
                rarity: Rarity::Rare,
                item_id: "x".into(),
                name: String::new(),
                icon: String::new(),
                effect,
            };
            on_item_drop(&mut engine, &roll).unwrap();
        }
        let run = engine.run().unwrap();
        assert_eq!(run.timer, base_timer + 15);
        assert_eq!(run.combo, 3);
        assert_eq!(run.best_combo, 3);
        assert_eq!(run.free_hints, 1);
        assert!((run.gold_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(run.time_stop_charges, 1);
    }

    #[test]
    fn notice_clears_only_for_its_own_token() {
        let mut engine = engine();
        start_run(&mut engine, 1).unwrap();
        let roll = DropRoll {
            rarity: Rarity::Normal,
            item_id: "herb".into(),
            name: "Herb".into(),
            icon: String::new(),
            effect: DropEffect::Hp(20),
        };
        on_item_drop(&mut engine, &roll).unwrap();
        engine.advance(1_500).unwrap();
        on_item_drop(&mut engine, &roll).unwrap();
        let second = engine.run().unwrap().notice.as_ref().unwrap().token;

        // first clear fires, but the newer notice stays up
        engine.advance(600).unwrap();
        assert_eq!(
            engine.run().unwrap().notice.as_ref().map(|notice| notice.token),
            Some(second)
        );
        engine.advance(1_500).unwrap();
        assert!(engine.run().unwrap().notice.is_none());
    }

    #[test]
    fn bonus_drop_lands_after_delay() {
        let mut engine = engine();
        start_run(&mut engine, 3).unwrap();
        let mut scheduled = false;
        for _ in 0..32 {
            if check_drop(&mut engine, MonsterClass::FinalBoss)
                .unwrap()
                .bonus_scheduled
            {
                scheduled = true;
                break;
            }
        }
        assert!(scheduled, "coin flip never landed in 32 tries");
        engine.drain_feedback();
        engine.advance(BONUS_DROP_DELAY_MS - 1).unwrap();
        assert!(
            !engine
                .drain_feedback()
                .iter()
                .any(|fb| matches!(fb, Feedback::ItemDropped { .. }))
        );
        engine.advance(1).unwrap();
        assert!(
            engine
                .drain_feedback()
                .iter()
                .any(|fb| matches!(fb, Feedback::ItemDropped { .. }))
        );
    }
}
