//! Outbound side-effect requests for the presentation layer.
//!
//! The engines never render or play anything themselves; they queue these
//! requests and the UI drains them after each call.
use serde::{Deserialize, Serialize};

use crate::config::{CosmeticCategory, Rarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundCue {
    LevelUp,
    Purchase,
    Equip,
    Denied,
    ItemDrop,
    Correct,
    Wrong,
    Revive,
}

/// Visual feedback requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VisualFx {
    Particles { category: Option<CosmeticCategory> },
    CorrectFlash,
    FloatingText { text: String },
}

/// Transient notice shown when an item drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropNotice {
    pub token: u64,
    pub item_id: String,
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Feedback {
    PlaySound { cue: SoundCue },
    Visual { fx: VisualFx },
    Notification { message: String },
    ItemDropped { notice: DropNotice },
    LevelUp { level: u32, message: String },
    InsufficientFunds { shortfall: u64 },
    AchievementRecheck,
}

impl Feedback {
    #[must_use]
    pub const fn sound(cue: SoundCue) -> Self {
        Self::PlaySound { cue }
    }

    #[must_use]
    pub const fn visual(fx: VisualFx) -> Self {
        Self::Visual { fx }
    }
}
