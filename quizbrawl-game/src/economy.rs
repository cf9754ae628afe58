//! Gold sinks: upgrade pricing and purchases, consumables and cosmetics.
use rand::Rng;
use serde::Serialize;

use crate::config::{CosmeticCategory, GameConfig, ShopItemKind, UpgradeDef};
use crate::constants::{
    PRICE_EARLY_GROWTH, PRICE_EARLY_STEPS, PRICE_LATE_GROWTH, PRICE_ROUNDING, UPGRADE_HP,
};
use crate::feedback::{Feedback, SoundCue, VisualFx};
use crate::numbers::{ceil_to_multiple, u64_to_f64};
use crate::player::Player;
use crate::progression::ProgressionEngine;
use crate::storage::{EngineError, RecordStore, RemoteSession};

/// What a purchase attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PurchaseOutcome {
    Purchased { price: u64 },
    /// An owned cosmetic was re-selected without charge.
    Equipped,
    InsufficientFunds { shortfall: u64 },
    Maxed,
    Unknown,
    NotForSale,
    NotStackable,
    InvalidQuantity,
}

impl PurchaseOutcome {
    #[must_use]
    pub const fn succeeded(self) -> bool {
        matches!(self, Self::Purchased { .. } | Self::Equipped)
    }
}

fn growth_rate(def: &UpgradeDef, step: u32) -> f64 {
    if let Some(accel) = def.acceleration()
        && step >= accel.start
    {
        let tiers = (step - accel.start) / accel.interval.max(1) + 1;
        return f64::from(tiers).mul_add(accel.step, PRICE_LATE_GROWTH);
    }
    if step < PRICE_EARLY_STEPS {
        PRICE_EARLY_GROWTH
    } else {
        PRICE_LATE_GROWTH
    }
}

/// Price of buying level `level + 1` of an upgrade, rounded up to a multiple of 10.
#[must_use]
pub fn price_at(def: &UpgradeDef, level: u32) -> u64 {
    let base = u64_to_f64(def.base_price);
    let raw = if def.acceleration().is_some() {
        (0..level).fold(base, |price, step| price * growth_rate(def, step))
    } else if level >= PRICE_EARLY_STEPS {
        let late = i32::try_from(level - PRICE_EARLY_STEPS).unwrap_or(i32::MAX);
        base * PRICE_EARLY_GROWTH.powi(5) * PRICE_LATE_GROWTH.powi(late)
    } else {
        base * PRICE_EARLY_GROWTH.powi(i32::try_from(level).unwrap_or(i32::MAX))
    };
    ceil_to_multiple(raw, PRICE_ROUNDING)
}

/// Price of the player's next level of `id`; zero for unknown upgrades.
#[must_use]
pub fn upgrade_price(player: &Player, config: &GameConfig, id: &str) -> u64 {
    config
        .upgrade(id)
        .map_or(0, |def| price_at(def, player.upgrade_level(id)))
}

#[must_use]
pub const fn can_afford(player: &Player, price: u64) -> bool {
    player.gold >= price
}

/// Whether an upgrade has reached its max level. Unknown ids are never maxed.
#[must_use]
pub fn is_maxed(player: &Player, config: &GameConfig, id: &str) -> bool {
    config
        .upgrade(id)
        .is_some_and(|def| player.upgrade_level(id) >= def.max_level)
}

/// One row of the upgrade shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeListing {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub max_level: u32,
    /// `None` once maxed.
    pub next_price: Option<u64>,
    pub affordable: bool,
}

#[must_use]
pub fn upgrade_catalog(player: &Player, config: &GameConfig) -> Vec<UpgradeListing> {
    config
        .upgrades
        .iter()
        .map(|(id, def)| {
            let level = player.upgrade_level(id);
            let next_price = (level < def.max_level).then(|| price_at(def, level));
            UpgradeListing {
                id: id.clone(),
                name: def.name.clone(),
                level,
                max_level: def.max_level,
                next_price,
                affordable: next_price.is_some_and(|price| can_afford(player, price)),
            }
        })
        .collect()
}

/// Debit `price`, or announce the shortfall and leave the wallet untouched.
fn debit<S, R>(engine: &mut ProgressionEngine<S, R>, price: u64) -> Result<(), PurchaseOutcome>
where
    S: RecordStore,
    R: RemoteSession,
{
    let gold = engine.player().gold;
    if gold < price {
        let shortfall = price - gold;
        engine.emit(Feedback::InsufficientFunds { shortfall });
        engine.emit(Feedback::sound(SoundCue::Denied));
        return Err(PurchaseOutcome::InsufficientFunds { shortfall });
    }
    engine.player_mut().gold = gold - price;
    Ok(())
}

/// Buy the next level of a permanent upgrade.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn buy_upgrade<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    id: &str,
) -> Result<PurchaseOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let config = engine.shared_config();
    let Some(def) = config.upgrade(id) else {
        return Ok(PurchaseOutcome::Unknown);
    };
    let level = engine.player().upgrade_level(id);
    if level >= def.max_level {
        return Ok(PurchaseOutcome::Maxed);
    }
    let price = price_at(def, level);
    if let Err(denied) = debit(engine, price) {
        return Ok(denied);
    }

    let player = engine.player_mut();
    player.permanent_upgrades.insert(id.to_string(), level + 1);
    if id == UPGRADE_HP {
        player.max_hp = player.max_hp.saturating_add(def.value);
        player.current_hp = player.max_hp;
    }
    log::debug!("upgrade {id} -> {} for {price}", level + 1);

    engine.save()?;
    engine.emit(Feedback::AchievementRecheck);
    engine.emit(Feedback::sound(SoundCue::Purchase));
    engine.emit(Feedback::visual(VisualFx::Particles { category: None }));
    Ok(PurchaseOutcome::Purchased { price })
}

/// Buy one shop item. The random-background item re-rolls the arena
/// instead of entering the inventory.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn buy_item<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    id: &str,
) -> Result<PurchaseOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let config = engine.shared_config();
    let Some(item) = config.shop_item(id) else {
        return Ok(PurchaseOutcome::Unknown);
    };
    match item.kind {
        ShopItemKind::Consumable => buy_stack(engine, id, item.price, 1),
        ShopItemKind::RandomBackground => {
            if config.backgrounds.is_empty() {
                return Ok(PurchaseOutcome::Unknown);
            }
            if let Err(denied) = debit(engine, item.price) {
                return Ok(denied);
            }
            let current = engine.player().background.clone();
            let mut candidates: Vec<&String> = config
                .backgrounds
                .iter()
                .filter(|bg| current.as_ref() != Some(*bg))
                .collect();
            if candidates.is_empty() {
                candidates = config.backgrounds.iter().collect();
            }
            let pick = candidates[engine.rng().shop().gen_range(0..candidates.len())].clone();
            log::debug!("background re-rolled to {pick}");
            engine.player_mut().background = Some(pick.clone());

            engine.save()?;
            engine.emit(Feedback::sound(SoundCue::Purchase));
            engine.emit(Feedback::Notification { message: pick });
            Ok(PurchaseOutcome::Purchased { price: item.price })
        }
    }
}

/// Buy `count` of a stackable item in one transaction.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn buy_item_bulk<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    id: &str,
    count: u32,
) -> Result<PurchaseOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let config = engine.shared_config();
    let Some(item) = config.shop_item(id) else {
        return Ok(PurchaseOutcome::Unknown);
    };
    if !item.is_stackable() {
        return Ok(PurchaseOutcome::NotStackable);
    }
    if count == 0 {
        return Ok(PurchaseOutcome::InvalidQuantity);
    }
    buy_stack(engine, id, item.price, count)
}

fn buy_stack<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    id: &str,
    unit_price: u64,
    count: u32,
) -> Result<PurchaseOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let price = unit_price.saturating_mul(u64::from(count));
    if let Err(denied) = debit(engine, price) {
        return Ok(denied);
    }
    engine.player_mut().add_item(id, count);
    engine.save()?;
    engine.emit(Feedback::sound(SoundCue::Purchase));
    Ok(PurchaseOutcome::Purchased { price })
}

/// Buy a cosmetic and activate it. Owned cosmetics are activated free of charge.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn buy_cosmetic<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    category: CosmeticCategory,
    id: &str,
) -> Result<PurchaseOutcome, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    if engine.player().cosmetics.slot(category).owns(id) {
        equip_cosmetic(engine, category, id)?;
        return Ok(PurchaseOutcome::Equipped);
    }
    let config = engine.shared_config();
    let Some(item) = config.cosmetic(category, id) else {
        return Ok(PurchaseOutcome::Unknown);
    };
    if item.price == 0 {
        return Ok(PurchaseOutcome::NotForSale);
    }
    if let Err(denied) = debit(engine, item.price) {
        return Ok(denied);
    }

    let slot = engine.player_mut().cosmetics.slot_mut(category);
    slot.add(id);
    slot.active = id.to_string();
    engine.save()?;
    engine.emit(Feedback::sound(SoundCue::Purchase));
    engine.emit(Feedback::visual(VisualFx::Particles {
        category: Some(category),
    }));
    Ok(PurchaseOutcome::Purchased { price: item.price })
}

/// Activate an owned cosmetic. Returns `false` for ids the player does not own.
///
/// # Errors
///
/// Returns an error if the player record cannot be saved.
pub fn equip_cosmetic<S, R>(
    engine: &mut ProgressionEngine<S, R>,
    category: CosmeticCategory,
    id: &str,
) -> Result<bool, EngineError>
where
    S: RecordStore,
    R: RemoteSession,
{
    let slot = engine.player_mut().cosmetics.slot_mut(category);
    if !slot.owns(id) {
        return Ok(false);
    }
    slot.active = id.to_string();
    engine.save()?;
    engine.emit(Feedback::sound(SoundCue::Equip));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::EngineOptions;
    use crate::storage::{MemoryStore, Offline};

    fn plain(base_price: u64, max_level: u32) -> UpgradeDef {
        UpgradeDef {
            name: String::new(),
            base_price,
            max_level,
            value: 10,
            price_accel_start: None,
            price_accel_interval: None,
            price_accel_step: None,
        }
    }

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
    fn base_price_curve_matches_reference_points() {
        let def = plain(100, 20);
        assert_eq!(price_at(&def, 0), 100);
        assert_eq!(price_at(&def, 1), 110);
        assert_eq!(price_at(&def, 5), 170);
        assert!(price_at(&def, 6) > price_at(&def, 5));
    }

    #[test]
    fn prices_are_monotonic_multiples_of_ten() {
        let mut accelerated = plain(150, 40);
        accelerated.price_accel_start = Some(10);
        accelerated.price_accel_interval = Some(5);
        accelerated.price_accel_step = Some(0.05);
        for def in [plain(100, 40), plain(37, 40), accelerated] {
            let mut previous = 0;
            for level in 0..40 {
                let price = price_at(&def, level);
                assert_eq!(price % 10, 0, "level {level}");
                assert!(price >= previous, "level {level}");
                previous = price;
            }
        }
    }

    #[test]
    fn prices_saturate_instead_of_overflowing_at_extreme_levels() {
        let mut accelerated = plain(150, 10_000);
        accelerated.price_accel_start = Some(10);
        accelerated.price_accel_interval = Some(5);
        accelerated.price_accel_step = Some(0.05);
        let ceiling = u64::MAX / 10 * 10;
        for def in [plain(100, 10_000), accelerated] {
            let mut previous = 0;
            for level in [0, 5, 40, 320, 1_000, 5_000, 9_999] {
                let price = price_at(&def, level);
                assert!(price >= previous, "level {level}");
                previous = price;
            }
            assert_eq!(price_at(&def, 5_000), ceiling);
        }
    }

    #[test]
    fn acceleration_steepens_late_levels() {
        let mut accelerated = plain(100, 40);
        accelerated.price_accel_start = Some(6);
        accelerated.price_accel_interval = Some(2);
        accelerated.price_accel_step = Some(0.1);
        let flat = plain(100, 40);
        assert_eq!(price_at(&accelerated, 6), price_at(&flat, 6));
        assert!(price_at(&accelerated, 10) > price_at(&flat, 10));
    }

    #[test]
    fn unknown_upgrade_costs_nothing_and_is_inert() {
        let mut engine = engine();
        assert_eq!(upgrade_price(engine.player(), engine.config(), "nope"), 0);
        assert_eq!(buy_upgrade(&mut engine, "nope").unwrap(), PurchaseOutcome::Unknown);
        assert_eq!(engine.player().gold, 100);
    }

    #[test]
    fn insufficient_funds_mutates_nothing() {
        let mut engine = engine();
        engine.player_mut().gold = 40;
        let outcome = buy_upgrade(&mut engine, "hp").unwrap();
        assert_eq!(outcome, PurchaseOutcome::InsufficientFunds { shortfall: 60 });
        assert_eq!(engine.player().gold, 40);
        assert_eq!(engine.player().upgrade_level("hp"), 0);
        assert!(
            engine
                .drain_feedback()
                .contains(&Feedback::InsufficientFunds { shortfall: 60 })
        );
    }

    #[test]
    fn hp_upgrade_raises_and_refills_hp() {
        let mut engine = engine();
        engine.player_mut().gold = 1_000;
        engine.player_mut().current_hp = 20;
        let outcome = buy_upgrade(&mut engine, "hp").unwrap();
        assert_eq!(outcome, PurchaseOutcome::Purchased { price: 100 });
        let player = engine.player();
        assert_eq!(player.gold, 900);
        assert_eq!(player.upgrade_level("hp"), 1);
        assert_eq!(player.max_hp, 110);
        assert_eq!(player.current_hp, 110);
        assert_eq!(engine.max_hp(), player.max_hp);
        assert!(engine.drain_feedback().contains(&Feedback::AchievementRecheck));
    }

    #[test]
    fn maxed_upgrades_refuse_purchase() {
        let mut engine = engine();
        engine.player_mut().gold = u64::MAX / 2;
        engine.player_mut().permanent_upgrades.insert("time".into(), 15);
        assert!(is_maxed(engine.player(), engine.config(), "time"));
        let gold = engine.player().gold;
        assert_eq!(buy_upgrade(&mut engine, "time").unwrap(), PurchaseOutcome::Maxed);
        assert_eq!(engine.player().gold, gold);
    }

    #[test]
    fn catalog_lists_every_upgrade() {
        let engine = engine();
        let catalog = upgrade_catalog(engine.player(), engine.config());
        assert_eq!(catalog.len(), engine.config().upgrades.len());
        let hp = catalog.iter().find(|row| row.id == "hp").unwrap();
        assert_eq!(hp.next_price, Some(100));
        assert!(hp.affordable);
    }

    #[test]
    fn bulk_purchase_debits_once() {
        let mut engine = engine();
        assert_eq!(
            buy_item_bulk(&mut engine, "potion", 3).unwrap(),
            PurchaseOutcome::Purchased { price: 90 }
        );
        assert_eq!(engine.player().gold, 10);
        assert_eq!(engine.player().item_count("potion"), 3);
        assert_eq!(
            buy_item_bulk(&mut engine, "randomBackground", 2).unwrap(),
            PurchaseOutcome::NotStackable
        );
        assert_eq!(
            buy_item_bulk(&mut engine, "potion", 0).unwrap(),
            PurchaseOutcome::InvalidQuantity
        );
    }

    #[test]
    fn random_background_changes_the_backdrop() {
        let mut engine = engine();
        engine.player_mut().gold = 1_000;
        for _ in 0..10 {
            let before = engine.player().background.clone();
            assert!(buy_item(&mut engine, "randomBackground").unwrap().succeeded());
            let after = engine.player().background.clone();
            assert!(after.is_some());
            assert_ne!(before, after);
        }
        assert_eq!(engine.player().item_count("randomBackground"), 0);
    }

    #[test]
    fn owned_cosmetics_equip_for_free() {
        let mut engine = engine();
        engine.player_mut().gold = 600;
        assert_eq!(
            buy_cosmetic(&mut engine, CosmeticCategory::Theme, "sakura").unwrap(),
            PurchaseOutcome::Purchased { price: 500 }
        );
        equip_cosmetic(&mut engine, CosmeticCategory::Theme, "default").unwrap();
        assert_eq!(
            buy_cosmetic(&mut engine, CosmeticCategory::Theme, "sakura").unwrap(),
            PurchaseOutcome::Equipped
        );
        assert_eq!(engine.player().gold, 100);
        assert_eq!(engine.player().cosmetics.theme.active, "sakura");
    }

    #[test]
    fn cosmetic_edge_cases_are_inert() {
        let mut engine = engine();
        assert!(!equip_cosmetic(&mut engine, CosmeticCategory::Particle, "stars").unwrap());
        assert_eq!(engine.player().cosmetics.particle.active, "default");
        assert_eq!(
            buy_cosmetic(&mut engine, CosmeticCategory::Theme, "missing").unwrap(),
            PurchaseOutcome::Unknown
        );
        assert_eq!(
            buy_cosmetic(&mut engine, CosmeticCategory::Theme, "sakura").unwrap(),
            PurchaseOutcome::InsufficientFunds { shortfall: 400 }
        );
        assert!(!engine.player().cosmetics.theme.owns("sakura"));
    }
}
