//! Quizbrawl Game Engine
//!
//! Platform-agnostic progression, economy, reward and analytics core for the
//! Quizbrawl quiz battler. This crate owns the player record and every rule
//! that changes it, without UI or platform-specific dependencies. Storage and
//! the remote backup session are supplied through [`RecordStore`] and
//! [`RemoteSession`].

pub mod analytics;
pub mod config;
pub mod constants;
pub mod economy;
pub mod feedback;
pub mod numbers;
pub mod player;
pub mod progression;
pub mod reward;
pub mod rng;
pub mod run;
pub mod storage;
pub mod timers;

// Re-export commonly used types
pub use analytics::{
    Accuracy, AttemptStats, MonsterRecord, RunRecord, StatsCache, StatsSnapshot, aggregate_stats,
};
pub use config::{
    AchievementBonus, AnswerConfig, ConfigError, CosmeticCategory, CosmeticItem, DropEffect,
    DropItemDef, DropRates, GameConfig, KillGold, LevelConfig, MonsterClass, PriceAccel, Rarity,
    RarityTable, RarityTier, ShopItem, ShopItemKind, UpgradeDef,
};
pub use economy::{
    PurchaseOutcome, UpgradeListing, buy_cosmetic, buy_item, buy_item_bulk, buy_upgrade,
    can_afford, equip_cosmetic, is_maxed, price_at, upgrade_catalog, upgrade_price,
};
pub use feedback::{DropNotice, Feedback, SoundCue, VisualFx};
pub use player::{
    CosmeticSlot, Cosmetics, DailyMissions, MigrationReport, MissionProgress, Player, PlayerStats,
    StoredPlayer,
};
pub use progression::{EngineOptions, ExpOutcome, ProgressionEngine, damage, max_hp, time_limit};
pub use reward::{DropOutcome, DropRoll, check_drop, on_item_drop, roll_item_drop};
pub use rng::{CountingRng, RngBundle};
pub use run::{
    AnswerOutcome, DefeatOutcome, RunEnd, RunState, answer, defeat_monster, finish_run,
    start_run, tick_timer, use_free_hint, use_revive,
};
pub use storage::{
    Collection, EngineError, MemoryStore, MemoryStoreError, Offline, RecordStore, RemoteSession,
};
pub use timers::{TimerId, TimerQueue};
