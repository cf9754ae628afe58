//! Read-only configuration tables: level curve, catalogs and drop tables.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{FINAL_BOSS_DROP_CHANCE, MID_BOSS_DROP_CHANCE};
use crate::numbers::ceil_to_multiple;

const DEFAULT_CONFIG: &str = include_str!("../data/game_config.json");

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max level must be at least 1")]
    MaxLevelZero,
    #[error("{field} must be at least 1")]
    ZeroInterval { field: &'static str },
    #[error("{field} must be between 0 and 1 (got {value:.3})")]
    ChanceRange { field: String, value: f64 },
    #[error("rarity drop rates sum to {total:.3}, which exceeds 1")]
    RaritySum { total: f64 },
    #[error("upgrade `{id}` has a zero acceleration interval")]
    AccelInterval { id: String },
    #[error("upgrade `{id}` has a zero max level")]
    UpgradeMaxLevel { id: String },
}

/// Level curve and per-level stat growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelConfig {
    pub max_level: u32,
    pub hp_per_level: u32,
    pub damage_level_interval: u32,
    pub damage_per_levels: u32,
    pub time_level_interval: u32,
    pub time_per_levels: u32,
    /// Experience required to leave level 1.
    pub exp_base: u64,
    /// Geometric growth of the requirement per level.
    pub exp_growth: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            max_level: 30,
            hp_per_level: 5,
            damage_level_interval: 3,
            damage_per_levels: 2,
            time_level_interval: 5,
            time_per_levels: 5,
            exp_base: 100,
            exp_growth: 1.15,
        }
    }
}

impl LevelConfig {
    /// Experience needed to advance from `level` to `level + 1`.
    #[must_use]
    pub fn exp_for_level(&self, level: u32) -> u64 {
        let steps = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = crate::numbers::u64_to_f64(self.exp_base);
        ceil_to_multiple(base * self.exp_growth.max(1.0).powi(steps), 1).max(1)
    }
}

/// Price acceleration parameters for late-game upgrade levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAccel {
    pub start: u32,
    pub interval: u32,
    pub step: f64,
}

/// A permanent upgrade definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDef {
    #[serde(default)]
    pub name: String,
    pub base_price: u64,
    pub max_level: u32,
    pub value: u32,
    #[serde(default)]
    pub price_accel_start: Option<u32>,
    #[serde(default)]
    pub price_accel_interval: Option<u32>,
    #[serde(default)]
    pub price_accel_step: Option<f64>,
}

impl UpgradeDef {
    /// Acceleration parameters, present only when all three are configured.
    #[must_use]
    pub fn acceleration(&self) -> Option<PriceAccel> {
        match (
            self.price_accel_start,
            self.price_accel_interval,
            self.price_accel_step,
        ) {
            (Some(start), Some(interval), Some(step)) => Some(PriceAccel {
                start,
                interval,
                step,
            }),
            _ => None,
        }
    }
}

/// How a shop item behaves once bought.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShopItemKind {
    /// Stacks in the inventory.
    #[default]
    Consumable,
    /// Re-rolls the arena background instead of entering the inventory.
    RandomBackground,
}

/// A consumable sold in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    #[serde(default)]
    pub name: String,
    pub price: u64,
    #[serde(default)]
    pub kind: ShopItemKind,
}

impl ShopItem {
    #[must_use]
    pub fn is_stackable(&self) -> bool {
        self.kind == ShopItemKind::Consumable
    }
}

/// Cosmetic categories the player can customize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CosmeticCategory {
    Theme,
    Particle,
    DamageText,
    CorrectFlash,
}

impl CosmeticCategory {
    pub const ALL: [Self; 4] = [
        Self::Theme,
        Self::Particle,
        Self::DamageText,
        Self::CorrectFlash,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Particle => "particle",
            Self::DamageText => "damageText",
            Self::CorrectFlash => "correctFlash",
        }
    }
}

impl std::fmt::Display for CosmeticCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub price: u64,
}

/// Monster classification used for drop chances and kill rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonsterClass {
    Trash,
    Boss,
    MidBoss,
    FinalBoss,
}

/// Configured drop chances; mid and final bosses use fixed rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DropRates {
    pub base: f64,
    pub boss: f64,
}

impl Default for DropRates {
    fn default() -> Self {
        Self {
            base: 0.15,
            boss: 0.4,
        }
    }
}

impl DropRates {
    #[must_use]
    pub fn chance_for(&self, class: MonsterClass) -> f64 {
        match class {
            MonsterClass::FinalBoss => FINAL_BOSS_DROP_CHANCE,
            MonsterClass::MidBoss => MID_BOSS_DROP_CHANCE,
            MonsterClass::Boss => self.boss,
            MonsterClass::Trash => self.base,
        }
    }
}

/// Rarity tiers, rarest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Legendary,
    Epic,
    Rare,
    Normal,
}

impl Rarity {
    /// Tiers walked by cumulative probability; `Normal` is the fallback.
    pub const WEIGHTED: [Self; 3] = [Self::Legendary, Self::Epic, Self::Rare];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legendary => "legendary",
            Self::Epic => "epic",
            Self::Rare => "rare",
            Self::Normal => "normal",
        }
    }
}

/// Effect carried by a dropped item, tagged with its magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum DropEffect {
    Hp(u32),
    Time(u32),
    AllTime(u32),
    Gold(u64),
    Combo(u32),
    FreeHint(u32),
    Revive(u32),
    GoldMulti(f64),
    TimeStop(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropItemDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub effect: DropEffect,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityTier {
    #[serde(default)]
    pub drop_rate: f64,
    #[serde(default)]
    pub items: Vec<DropItemDef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RarityTable {
    pub legendary: RarityTier,
    pub epic: RarityTier,
    pub rare: RarityTier,
    pub normal: RarityTier,
}

impl RarityTable {
    #[must_use]
    pub const fn tier(&self, rarity: Rarity) -> &RarityTier {
        match rarity {
            Rarity::Legendary => &self.legendary,
            Rarity::Epic => &self.epic,
            Rarity::Rare => &self.rare,
            Rarity::Normal => &self.normal,
        }
    }
}

/// Stat bonus granted by an unlocked achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementBonus {
    pub hp: u32,
    pub damage: u32,
}

/// Gold awarded per defeated monster class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KillGold {
    pub trash: u64,
    pub boss: u64,
    pub mid_boss: u64,
    pub final_boss: u64,
}

impl Default for KillGold {
    fn default() -> Self {
        Self {
            trash: 5,
            boss: 25,
            mid_boss: 50,
            final_boss: 120,
        }
    }
}

impl KillGold {
    #[must_use]
    pub const fn for_class(&self, class: MonsterClass) -> u64 {
        match class {
            MonsterClass::Trash => self.trash,
            MonsterClass::Boss => self.boss,
            MonsterClass::MidBoss => self.mid_boss,
            MonsterClass::FinalBoss => self.final_boss,
        }
    }
}

/// Rewards and penalties for answering questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerConfig {
    pub exp_per_correct: u64,
    pub wrong_answer_damage: u32,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            exp_per_correct: 10,
            wrong_answer_damage: 15,
        }
    }
}

/// Complete configuration consumed by the engines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub levels: LevelConfig,
    pub upgrades: BTreeMap<String, UpgradeDef>,
    pub shop: BTreeMap<String, ShopItem>,
    pub backgrounds: Vec<String>,
    pub cosmetics: BTreeMap<CosmeticCategory, Vec<CosmeticItem>>,
    pub drop_rates: DropRates,
    pub rarities: RarityTable,
    pub achievements: BTreeMap<String, AchievementBonus>,
    pub kill_gold: KillGold,
    pub answers: AnswerConfig,
}

impl GameConfig {
    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The configuration bundled with the crate.
    ///
    /// Falls back to built-in level defaults with empty catalogs if the
    /// bundled asset fails to parse.
    #[must_use]
    pub fn bundled() -> Self {
        Self::from_json(DEFAULT_CONFIG).unwrap_or_default()
    }

    #[must_use]
    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.get(id)
    }

    #[must_use]
    pub fn shop_item(&self, id: &str) -> Option<&ShopItem> {
        self.shop.get(id)
    }

    #[must_use]
    pub fn cosmetic(&self, category: CosmeticCategory, id: &str) -> Option<&CosmeticItem> {
        self.cosmetics
            .get(&category)
            .and_then(|items| items.iter().find(|item| item.id == id))
    }

    /// Check structural invariants the engines rely on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = &self.levels;
        if levels.max_level == 0 {
            return Err(ConfigError::MaxLevelZero);
        }
        if levels.damage_level_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "damageLevelInterval",
            });
        }
        if levels.time_level_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "timeLevelInterval",
            });
        }

        check_chance("dropRates.base", self.drop_rates.base)?;
        check_chance("dropRates.boss", self.drop_rates.boss)?;
        let mut total = 0.0;
        for rarity in Rarity::WEIGHTED {
            let rate = self.rarities.tier(rarity).drop_rate;
            check_chance(&format!("rarities.{}.dropRate", rarity.as_str()), rate)?;
            total += rate;
        }
        if total > 1.0 + f64::EPSILON {
            return Err(ConfigError::RaritySum { total });
        }

        for (id, def) in &self.upgrades {
            if def.max_level == 0 {
                return Err(ConfigError::UpgradeMaxLevel { id: id.clone() });
            }
            if def.acceleration().is_some_and(|accel| accel.interval == 0) {
                return Err(ConfigError::AccelInterval { id: id.clone() });
            }
        }
        Ok(())
    }
}

fn check_chance(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ChanceRange {
            field: field.to_string(),
            value,
        })
    }
}
