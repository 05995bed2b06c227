//! ReportEmitter - Durable Inventory Snapshot
//!
//! ## Responsibilities
//!
//! - Serialize the final inventory snapshot at session end
//! - Write it where the external report renderer picks it up
//!
//! The snapshot shape `{timestamp, inventory, notes, current_room}` is
//! the sole contract the report renderer depends on; field names and
//! nesting are fixed.

use crate::error::Result;
use crate::inventory_store::InventoryStore;
use serde_json::json;
use std::path::PathBuf;

/// Snapshot writer
pub struct ReportEmitter {
    path: PathBuf,
}

impl ReportEmitter {
    /// Create new report emitter
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Snapshot destination
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Write the inventory snapshot
    ///
    /// Failure is the caller's to log; the in-memory summary has already
    /// been delivered over the data channel regardless.
    pub async fn persist(&self, inventory: &InventoryStore) -> Result<()> {
        let snapshot = json!({
            "timestamp": chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            "inventory": inventory.to_json(),
            "notes": inventory.notes(),
            "current_room": inventory.current_room(),
        });

        let data = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, data).await?;

        let totals = inventory.totals();
        tracing::info!(
            path = %self.path.display(),
            rooms = totals.rooms,
            total_items = totals.total_items,
            fragile_items = totals.fragile_items,
            "Inventory snapshot persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectedItem, DetectionRecord, ItemSize};

    #[tokio::test]
    async fn test_persist_writes_exact_snapshot_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let emitter = ReportEmitter::new(path.clone());

        let mut inventory = InventoryStore::new();
        inventory.merge(&DetectionRecord {
            room_type: "bedroom".to_string(),
            items: vec![DetectedItem {
                name: "lamp".to_string(),
                qty: 3,
                size: ItemSize::Small,
                fragile: false,
            }],
            notes: "window side".to_string(),
        });

        emitter.persist(&inventory).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(value["timestamp"].as_f64().unwrap() > 0.0);
        assert_eq!(value["inventory"]["bedroom"]["lamp"]["qty"], 3);
        assert_eq!(value["inventory"]["bedroom"]["lamp"]["size"], "small");
        assert_eq!(value["inventory"]["bedroom"]["lamp"]["fragile"], false);
        assert_eq!(value["notes"][0], "bedroom: window side");
        assert_eq!(value["current_room"], "bedroom");
    }

    #[tokio::test]
    async fn test_persist_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("inventory.json");
        let emitter = ReportEmitter::new(path.clone());

        emitter.persist(&InventoryStore::new()).await.unwrap();
        assert!(path.exists());
    }
}
