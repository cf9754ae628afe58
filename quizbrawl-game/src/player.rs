//! The persistent player record and its schema normalization.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::collections::BTreeMap;

use crate::config::CosmeticCategory;
use crate::constants::{DEFAULT_COSMETIC_ID, STARTING_GOLD, STARTING_LEVEL};

/// Purchased set and active selection for one cosmetic category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticSlot {
    pub purchased: SmallVec<[String; 4]>,
    pub active: String,
}

impl Default for CosmeticSlot {
    fn default() -> Self {
        Self {
            purchased: smallvec![DEFAULT_COSMETIC_ID.to_string()],
            active: DEFAULT_COSMETIC_ID.to_string(),
        }
    }
}

impl CosmeticSlot {
    #[must_use]
    pub fn owns(&self, id: &str) -> bool {
        self.purchased.iter().any(|owned| owned == id)
    }

    /// Add an id to the purchased set. Returns `false` if it was already owned.
    pub fn add(&mut self, id: &str) -> bool {
        if self.owns(id) {
            return false;
        }
        self.purchased.push(id.to_string());
        true
    }

    /// Repair the slot in place. Returns `true` if anything changed.
    fn normalize(&mut self) -> bool {
        let before = self.clone();
        let mut seen: SmallVec<[String; 4]> = SmallVec::new();
        for id in self.purchased.drain(..) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        self.purchased = seen;
        if !self.owns(DEFAULT_COSMETIC_ID) {
            self.purchased.insert(0, DEFAULT_COSMETIC_ID.to_string());
        }
        if !self.owns(&self.active) {
            self.active = DEFAULT_COSMETIC_ID.to_string();
        }
        *self != before
    }
}

/// Cosmetic state across every category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cosmetics {
    pub theme: CosmeticSlot,
    pub particle: CosmeticSlot,
    pub damage_text: CosmeticSlot,
    pub correct_flash: CosmeticSlot,
}

impl Cosmetics {
    #[must_use]
    pub const fn slot(&self, category: CosmeticCategory) -> &CosmeticSlot {
        match category {
            CosmeticCategory::Theme => &self.theme,
            CosmeticCategory::Particle => &self.particle,
            CosmeticCategory::DamageText => &self.damage_text,
            CosmeticCategory::CorrectFlash => &self.correct_flash,
        }
    }

    pub const fn slot_mut(&mut self, category: CosmeticCategory) -> &mut CosmeticSlot {
        match category {
            CosmeticCategory::Theme => &mut self.theme,
            CosmeticCategory::Particle => &mut self.particle,
            CosmeticCategory::DamageText => &mut self.damage_text,
            CosmeticCategory::CorrectFlash => &mut self.correct_flash,
        }
    }

    fn normalize(&mut self) -> bool {
        let mut repaired = false;
        for category in CosmeticCategory::ALL {
            repaired |= self.slot_mut(category).normalize();
        }
        repaired
    }
}

/// Lifetime counters kept on the player record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    pub total_runs: u64,
    pub total_kills: u64,
    pub best_combo: u32,
    pub total_clears: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionProgress {
    pub id: String,
    pub progress: u32,
    pub target: u32,
    pub claimed: bool,
}

/// Daily mission progress; owned by the missions collaborator and carried through saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyMissions {
    pub date: Option<String>,
    pub missions: Vec<MissionProgress>,
}

/// The singleton player profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub created_at: u64,
    pub level: u32,
    pub exp: u64,
    pub gold: u64,
    pub max_hp: u32,
    pub current_hp: u32,
    pub permanent_upgrades: BTreeMap<String, u32>,
    pub inventory: BTreeMap<String, u32>,
    pub cosmetics: Cosmetics,
    pub background: Option<String>,
    pub achievements: Vec<String>,
    pub daily_missions: DailyMissions,
    pub total_gold_earned: u64,
    pub total_correct_answers: u64,
    pub subject_counts: BTreeMap<String, u64>,
    pub stats: PlayerStats,
}

impl Player {
    /// A fresh profile with documented defaults. Vitals are filled in by the
    /// progression engine, which owns the derived-stat formulas.
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: id.into(),
            created_at,
            level: STARTING_LEVEL,
            exp: 0,
            gold: STARTING_GOLD,
            max_hp: 0,
            current_hp: 0,
            permanent_upgrades: BTreeMap::new(),
            inventory: BTreeMap::new(),
            cosmetics: Cosmetics::default(),
            background: None,
            achievements: Vec::new(),
            daily_missions: DailyMissions::default(),
            total_gold_earned: 0,
            total_correct_answers: 0,
            subject_counts: BTreeMap::new(),
            stats: PlayerStats::default(),
        }
    }

    #[must_use]
    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.permanent_upgrades.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn item_count(&self, id: &str) -> u32 {
        self.inventory.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|owned| owned == id)
    }

    /// Add `count` of an item to the inventory, saturating.
    pub fn add_item(&mut self, id: &str, count: u32) {
        let entry = self.inventory.entry(id.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }
}

/// What the normalization step had to repair on a loaded record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// The record predates cosmetics; a one-off remote re-sync is owed.
    pub cosmetics_synthesized: bool,
    pub inventory_initialized: bool,
    pub cosmetics_repaired: bool,
    /// The stored level sat above the configured cap.
    pub level_capped: bool,
}

impl MigrationReport {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.cosmetics_synthesized
            && !self.inventory_initialized
            && !self.cosmetics_repaired
            && !self.level_capped
    }
}

const fn default_level() -> u32 {
    STARTING_LEVEL
}

/// Player record as it may exist in storage, including legacy shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlayer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub exp: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub current_hp: u32,
    #[serde(default)]
    pub permanent_upgrades: BTreeMap<String, u32>,
    #[serde(default)]
    pub inventory: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub cosmetics: Option<Cosmetics>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub daily_missions: DailyMissions,
    #[serde(default)]
    pub total_gold_earned: u64,
    #[serde(default)]
    pub total_correct_answers: u64,
    #[serde(default)]
    pub subject_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub stats: PlayerStats,
}

impl StoredPlayer {
    /// Produce a fully-populated record, reporting every repair made.
    ///
    /// Vitals are left for the caller to recompute.
    #[must_use]
    pub fn normalize(self) -> (Player, MigrationReport) {
        let mut report = MigrationReport::default();
        let inventory = self.inventory.unwrap_or_else(|| {
            report.inventory_initialized = true;
            BTreeMap::new()
        });
        let mut cosmetics = self.cosmetics.unwrap_or_else(|| {
            report.cosmetics_synthesized = true;
            Cosmetics::default()
        });
        report.cosmetics_repaired = cosmetics.normalize();

        let player = Player {
            id: self.id,
            created_at: self.created_at,
            level: self.level.max(STARTING_LEVEL),
            exp: self.exp,
            gold: self.gold,
            max_hp: 0,
            current_hp: self.current_hp,
            permanent_upgrades: self.permanent_upgrades,
            inventory,
            cosmetics,
            background: self.background,
            achievements: self.achievements,
            daily_missions: self.daily_missions,
            total_gold_earned: self.total_gold_earned,
            total_correct_answers: self.total_correct_answers,
            subject_counts: self.subject_counts,
            stats: self.stats,
        };
        (player, report)
    }
}
