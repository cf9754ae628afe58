//! Centralized balance and tuning constants for Quizbrawl game logic.
//!
//! Tunables that designers adjust per release live in the bundled JSON
//! config; the values here are the fixed rules the formulas are built on.

// Storage keys -------------------------------------------------------------
pub const PLAYER_KEY: &str = "main";
pub const DEFAULT_COSMETIC_ID: &str = "default";
pub const REVIVE_TICKET_ID: &str = "reviveTicket";

// Player defaults ----------------------------------------------------------
pub const DEFAULT_HP: u32 = 100;
pub const DEFAULT_DAMAGE: u32 = 10;
pub const STARTING_GOLD: u64 = 100;
pub const STARTING_LEVEL: u32 = 1;

// Max-level flat bonuses ---------------------------------------------------
pub const MAX_LEVEL_HP_BONUS: u32 = 10;
pub const MAX_LEVEL_DAMAGE_BONUS: u32 = 10;
pub const MAX_LEVEL_TIME_BONUS: u32 = 15;

// Run timer base by difficulty tier ---------------------------------------
pub const TIME_BASE_EASY: u32 = 60;
pub const TIME_BASE_NORMAL: u32 = 100;
pub const TIME_BASE_HARD: u32 = 160;

// Upgrade ids with engine-side meaning ------------------------------------
pub const UPGRADE_HP: &str = "hp";
pub const UPGRADE_DAMAGE: &str = "damage";
pub const UPGRADE_TIME: &str = "time";
pub const UPGRADE_GOLD_BONUS: &str = "goldBonus";

// Upgrade price curve ------------------------------------------------------
pub(crate) const PRICE_EARLY_GROWTH: f64 = 1.10;
pub(crate) const PRICE_LATE_GROWTH: f64 = 1.15;
pub(crate) const PRICE_EARLY_STEPS: u32 = 5;
pub(crate) const PRICE_ROUNDING: u64 = 10;

// Drops --------------------------------------------------------------------
pub const FINAL_BOSS_DROP_CHANCE: f64 = 1.0;
pub const MID_BOSS_DROP_CHANCE: f64 = 0.7;
pub const FINAL_BOSS_BONUS_CHANCE: f64 = 0.5;

// Timers (virtual milliseconds) -------------------------------------------
pub const REMOTE_SYNC_DEBOUNCE_MS: u64 = 1_000;
pub const BONUS_DROP_DELAY_MS: u64 = 800;
pub const DROP_NOTICE_DURATION_MS: u64 = 2_000;

// Analytics ----------------------------------------------------------------
pub const RECENT_RUN_WINDOW: usize = 10;

// Messages -----------------------------------------------------------------
pub(crate) const MSG_MAX_LEVEL: &str = "levelup.max";
pub(crate) const MSG_LEVEL_BONUS_HP: &str = "levelup.bonus.hp";
pub(crate) const MSG_LEVEL_BONUS_DAMAGE: &str = "levelup.bonus.damage";
pub(crate) const MSG_LEVEL_BONUS_TIME: &str = "levelup.bonus.time";
