//! InventoryStore - Running Room-by-Room Inventory
//!
//! ## Responsibilities
//!
//! - Merge per-frame detections into a running inventory
//! - Deduplicate repeated sightings by (room, normalized item name)
//! - Accumulate consultation notes in arrival order
//! - Render the human-readable summary
//!
//! Merge policy: attributes other than quantity are fixed at first
//! observation (first-write-wins); only quantity accumulates. A single
//! frame rarely re-measures an item more reliably than the first
//! sighting, and overwriting risks flapping.

use crate::models::{DetectionRecord, ItemSize};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One physical item type within one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub qty: u32,
    pub size: ItemSize,
    pub fragile: bool,
}

/// Aggregate counts across the whole inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryTotals {
    pub rooms: usize,
    pub total_items: u32,
    pub fragile_items: u32,
    pub large_items: u32,
}

/// Running inventory for one consultation
///
/// Rooms and items are kept in first-insertion order; the summary and the
/// persisted snapshot iterate in that order. Write-once-grow-only: no
/// operation removes or decrements inventory during a session.
#[derive(Debug)]
pub struct InventoryStore {
    rooms: Vec<(String, Vec<(String, InventoryRecord)>)>,
    notes: Vec<String>,
    current_room: String,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self {
            rooms: Vec::new(),
            notes: Vec::new(),
            current_room: "unknown".to_string(),
        }
    }

    /// Merge one detection into the inventory
    ///
    /// The current room follows the latest detection unconditionally,
    /// even when the detection carries no items.
    pub fn merge(&mut self, detection: &DetectionRecord) {
        let room = if detection.room_type.is_empty() {
            "unknown"
        } else {
            detection.room_type.as_str()
        };
        self.current_room = room.to_string();

        let idx = match self.rooms.iter().position(|(name, _)| name == room) {
            Some(idx) => idx,
            None => {
                self.rooms.push((room.to_string(), Vec::new()));
                self.rooms.len() - 1
            }
        };

        let items = &mut self.rooms[idx].1;
        for item in &detection.items {
            let key = item.name.trim().to_lowercase();
            match items.iter_mut().find(|(name, _)| *name == key) {
                Some((_, record)) => record.qty += item.qty,
                None => items.push((
                    key,
                    InventoryRecord {
                        qty: item.qty,
                        size: item.size,
                        fragile: item.fragile,
                    },
                )),
            }
        }

        if !detection.notes.is_empty() {
            self.notes.push(format!("{}: {}", room, detection.notes));
        }
    }

    /// Render the multi-line inventory summary
    ///
    /// One line per room with at least one item, items in stored order.
    /// Rooms observed without items stay in the structure but are not
    /// listed.
    pub fn summarize(&self) -> String {
        if self.rooms.is_empty() {
            return "No items detected yet. Please show me around the room.".to_string();
        }

        let mut lines = Vec::new();
        for (room, items) in &self.rooms {
            if items.is_empty() {
                continue;
            }
            let rendered: Vec<String> = items
                .iter()
                .map(|(name, record)| {
                    let fragile = if record.fragile { " (fragile)" } else { "" };
                    format!("{} x{} ({}){}", name, record.qty, record.size, fragile)
                })
                .collect();
            lines.push(format!("**{}**: {}", title_case(room), rendered.join(", ")));
        }

        if lines.is_empty() {
            return "No items detected yet.".to_string();
        }
        lines.join("\n")
    }

    /// Aggregate statistics (quantity-weighted)
    pub fn totals(&self) -> InventoryTotals {
        let mut totals = InventoryTotals {
            rooms: self.rooms.len(),
            ..Default::default()
        };
        for (_, items) in &self.rooms {
            for (_, record) in items {
                totals.total_items += record.qty;
                if record.fragile {
                    totals.fragile_items += record.qty;
                }
                if record.size == ItemSize::Large {
                    totals.large_items += record.qty;
                }
            }
        }
        totals
    }

    /// Room type of the most recent detection
    pub fn current_room(&self) -> &str {
        &self.current_room
    }

    /// Consultation notes in arrival order
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Whether no room has been observed yet
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Look up one record by room and normalized item name
    pub fn get(&self, room: &str, item: &str) -> Option<&InventoryRecord> {
        self.rooms
            .iter()
            .find(|(name, _)| name == room)
            .and_then(|(_, items)| items.iter().find(|(name, _)| name == item))
            .map(|(_, record)| record)
    }

    /// Nested `{room: {item: record}}` JSON view for the snapshot
    pub fn to_json(&self) -> serde_json::Value {
        let mut rooms = serde_json::Map::new();
        for (room, items) in &self.rooms {
            let mut entries = serde_json::Map::new();
            for (name, record) in items {
                entries.insert(name.clone(), json!(record));
            }
            rooms.insert(room.clone(), serde_json::Value::Object(entries));
        }
        serde_json::Value::Object(rooms)
    }

    /// Drop all inventory, notes and room state for a fresh consultation
    pub fn clear(&mut self) {
        self.rooms.clear();
        self.notes.clear();
        self.current_room = "unknown".to_string();
    }
}

/// Capitalize the letter after each word boundary ("living_room" -> "Living_Room")
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_boundary = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_boundary = false;
        } else {
            out.push(ch);
            at_boundary = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectedItem;

    fn detection(room: &str, items: Vec<DetectedItem>, notes: &str) -> DetectionRecord {
        DetectionRecord {
            room_type: room.to_string(),
            items,
            notes: notes.to_string(),
        }
    }

    fn item(name: &str, qty: u32, size: ItemSize, fragile: bool) -> DetectedItem {
        DetectedItem {
            name: name.to_string(),
            qty,
            size,
            fragile,
        }
    }

    #[test]
    fn test_quantity_accumulates_attributes_first_write_wins() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "bedroom",
            vec![item("lamp", 1, ItemSize::Small, false)],
            "",
        ));
        store.merge(&detection(
            "bedroom",
            vec![item("lamp", 2, ItemSize::Large, true)],
            "",
        ));

        let record = store.get("bedroom", "lamp").unwrap();
        assert_eq!(record.qty, 3);
        assert_eq!(record.size, ItemSize::Small);
        assert!(!record.fragile);
    }

    #[test]
    fn test_normalized_key_deduplicates_sightings() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "bedroom",
            vec![item("Lamp ", 1, ItemSize::Small, false)],
            "",
        ));
        store.merge(&detection(
            "bedroom",
            vec![item("  lamp", 1, ItemSize::Small, false)],
            "",
        ));

        assert_eq!(store.get("bedroom", "lamp").unwrap().qty, 2);
        assert_eq!(store.totals().total_items, 2);
    }

    #[test]
    fn test_room_is_part_of_identity_key() {
        let mut store = InventoryStore::new();
        for _ in 0..3 {
            store.merge(&detection(
                "bedroom",
                vec![item("lamp", 1, ItemSize::Small, false)],
                "",
            ));
        }
        store.merge(&detection(
            "kitchen",
            vec![item("Lamp", 2, ItemSize::Small, false)],
            "",
        ));

        assert_eq!(store.get("bedroom", "lamp").unwrap().qty, 3);
        assert_eq!(store.get("kitchen", "lamp").unwrap().qty, 2);
    }

    #[test]
    fn test_current_room_follows_latest_detection() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "bedroom",
            vec![item("lamp", 1, ItemSize::Small, false)],
            "",
        ));
        store.merge(&detection("hallway", vec![], ""));

        assert_eq!(store.current_room(), "hallway");
        assert!(store.get("hallway", "lamp").is_none());
    }

    #[test]
    fn test_empty_room_type_falls_back_to_unknown() {
        let mut store = InventoryStore::new();
        store.merge(&detection("", vec![], ""));
        assert_eq!(store.current_room(), "unknown");
    }

    #[test]
    fn test_notes_append_in_arrival_order() {
        let mut store = InventoryStore::new();
        store.merge(&detection("bedroom", vec![], "dark corner"));
        store.merge(&detection("kitchen", vec![], "lots of glassware"));
        store.merge(&detection("kitchen", vec![], "lots of glassware"));

        assert_eq!(
            store.notes(),
            &[
                "bedroom: dark corner".to_string(),
                "kitchen: lots of glassware".to_string(),
                "kitchen: lots of glassware".to_string(),
            ]
        );
    }

    #[test]
    fn test_summarize_empty_inventory_prompt() {
        let store = InventoryStore::new();
        assert_eq!(
            store.summarize(),
            "No items detected yet. Please show me around the room."
        );
    }

    #[test]
    fn test_summarize_omits_rooms_without_items() {
        let mut store = InventoryStore::new();
        store.merge(&detection("hallway", vec![], ""));
        store.merge(&detection(
            "bedroom",
            vec![
                item("lamp", 2, ItemSize::Small, false),
                item("mirror", 1, ItemSize::Medium, true),
            ],
            "",
        ));

        let summary = store.summarize();
        assert_eq!(
            summary,
            "**Bedroom**: lamp x2 (small), mirror x1 (medium) (fragile)"
        );
    }

    #[test]
    fn test_summarize_keeps_first_insertion_order() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "living_room",
            vec![item("sofa", 1, ItemSize::Large, false)],
            "",
        ));
        store.merge(&detection(
            "kitchen",
            vec![item("plates", 6, ItemSize::Small, true)],
            "",
        ));
        store.merge(&detection(
            "living_room",
            vec![item("tv", 1, ItemSize::Medium, true)],
            "",
        ));

        let summary = store.summarize();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("**Living_Room**: sofa x1 (large), tv x1 (medium) (fragile)"));
        assert!(lines[1].starts_with("**Kitchen**: plates x6 (small) (fragile)"));
    }

    #[test]
    fn test_totals_are_quantity_weighted() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "kitchen",
            vec![
                item("plates", 6, ItemSize::Small, true),
                item("fridge", 1, ItemSize::Large, false),
            ],
            "",
        ));
        store.merge(&detection("hallway", vec![], ""));

        let totals = store.totals();
        assert_eq!(totals.rooms, 2);
        assert_eq!(totals.total_items, 7);
        assert_eq!(totals.fragile_items, 6);
        assert_eq!(totals.large_items, 1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "bedroom",
            vec![item("lamp", 3, ItemSize::Small, false)],
            "",
        ));

        let value = store.to_json();
        assert_eq!(value["bedroom"]["lamp"]["qty"], 3);
        assert_eq!(value["bedroom"]["lamp"]["size"], "small");
        assert_eq!(value["bedroom"]["lamp"]["fragile"], false);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = InventoryStore::new();
        store.merge(&detection(
            "bedroom",
            vec![item("lamp", 1, ItemSize::Small, false)],
            "note",
        ));
        store.clear();

        assert!(store.is_empty());
        assert!(store.notes().is_empty());
        assert_eq!(store.current_room(), "unknown");
    }
}
