//! Shared detection data model
//!
//! Types shared between the detection client, the inventory store and the
//! frame pipeline, kept here to avoid circular dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical size class of a detected item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl fmt::Display for ItemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemSize::Small => write!(f, "small"),
            ItemSize::Medium => write!(f, "medium"),
            ItemSize::Large => write!(f, "large"),
        }
    }
}

/// One item as reported by the vision classifier for a single frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedItem {
    #[serde(default = "default_item_name")]
    pub name: String,

    #[serde(default = "default_qty")]
    pub qty: u32,

    #[serde(default)]
    pub size: ItemSize,

    #[serde(default)]
    pub fragile: bool,
}

fn default_item_name() -> String {
    "item".to_string()
}

fn default_qty() -> u32 {
    1
}

/// Structured result of one classifier invocation for a single frame
///
/// Transient: only its aggregate effect on the inventory and the
/// consultation notes survives the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(default = "default_room_type")]
    pub room_type: String,

    #[serde(default)]
    pub items: Vec<DetectedItem>,

    #[serde(default)]
    pub notes: String,
}

fn default_room_type() -> String {
    "unknown".to_string()
}

impl DetectionRecord {
    /// Neutral record carrying only a note (degraded detection)
    pub fn neutral(notes: impl Into<String>) -> Self {
        Self {
            room_type: "unknown".to_string(),
            items: Vec::new(),
            notes: notes.into(),
        }
    }
}
