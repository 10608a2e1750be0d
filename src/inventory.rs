//! Capacity-bounded containers and the vessel that owns them

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{ItemDescriptor, ResourceSnapshot};

/// One stack of a single item kind held in a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub name: String,
    pub quantity: u32,
    pub unit_mass: f64,
    pub unit_volume: f64,
    #[serde(default)]
    pub resources: Vec<ResourceSnapshot>,
}

impl StoredItem {
    pub fn from_descriptor(item: &ItemDescriptor) -> Self {
        Self {
            name: item.name.clone(),
            quantity: 1,
            unit_mass: item.unit_mass,
            unit_volume: item.unit_volume,
            resources: item.resources.clone(),
        }
    }

    /// Empty every onboard resource, keeping capacities
    pub fn drain_resources(&mut self) {
        for resource in &mut self.resources {
            resource.amount = 0.0;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub mass_capacity: Option<f64>,
    #[serde(default)]
    pub mass_used: f64,
    #[serde(default)]
    pub volume_capacity: Option<f64>,
    #[serde(default)]
    pub volume_used: f64,
    pub slots: Vec<Option<StoredItem>>,
}

impl Container {
    pub fn new(name: &str, slot_count: usize) -> Self {
        Self {
            name: name.to_string(),
            mass_capacity: None,
            mass_used: 0.0,
            volume_capacity: None,
            volume_used: 0.0,
            slots: vec![None; slot_count],
        }
    }

    pub fn with_mass_capacity(mut self, capacity: f64) -> Self {
        self.mass_capacity = Some(capacity);
        self
    }

    pub fn with_volume_capacity(mut self, capacity: f64) -> Self {
        self.volume_capacity = Some(capacity);
        self
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn free_mass(&self) -> Option<f64> {
        self.mass_capacity.map(|cap| cap - self.mass_used)
    }

    pub fn free_volume(&self) -> Option<f64> {
        self.volume_capacity.map(|cap| cap - self.volume_used)
    }

    /// Room for one more unit: a free slot and enough mass/volume headroom
    pub fn fits(&self, item: &ItemDescriptor) -> bool {
        if self.is_full() {
            return false;
        }
        if self.free_mass().is_some_and(|free| free < item.unit_mass) {
            return false;
        }
        if self.free_volume().is_some_and(|free| free < item.unit_volume) {
            return false;
        }
        true
    }

    /// Put a stack into an empty slot. Returns false, leaving the container
    /// untouched, when the slot is out of range or occupied.
    pub fn store(&mut self, slot: usize, item: StoredItem) -> bool {
        let Some(target) = self.slots.get_mut(slot).filter(|t| t.is_none()) else {
            return false;
        };
        *target = Some(item);
        self.settle_usage();
        true
    }

    /// Remove up to `count` units of an item, in slot order. Returns the
    /// number removed.
    pub fn take(&mut self, item_name: &str, count: u32) -> u32 {
        let mut needed = count;
        for slot in &mut self.slots {
            if needed == 0 {
                break;
            }
            let Some(stack) = slot.as_mut().filter(|s| s.name == item_name) else {
                continue;
            };

            let removed = stack.quantity.min(needed);
            stack.quantity -= removed;
            needed -= removed;

            if stack.quantity == 0 {
                *slot = None;
            }
        }
        self.settle_usage();
        count - needed
    }

    /// Recompute mass and volume usage from the occupied slots, so the
    /// same slot contents always give the same totals
    fn settle_usage(&mut self) {
        let (mass, volume) = self.stacks().fold((0.0, 0.0), |(mass, volume), s| {
            let quantity = f64::from(s.quantity);
            (mass + s.unit_mass * quantity, volume + s.unit_volume * quantity)
        });
        self.mass_used = mass;
        self.volume_used = volume;
    }

    pub fn count(&self, item_name: &str) -> u32 {
        self.stacks()
            .filter(|s| s.name == item_name)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn stacks(&self) -> impl Iterator<Item = &StoredItem> {
        self.slots.iter().flatten()
    }
}

/// The owner of a set of containers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub name: String,
    pub containers: Vec<Container>,
}

impl Vessel {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse vessel {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bolt() -> ItemDescriptor {
        ItemDescriptor::new("bolt", 1.0, 2.0)
    }

    #[test]
    fn test_new_container_is_empty() {
        let c = Container::new("locker", 3);
        assert!(c.is_empty());
        assert!(!c.is_full());
        assert_eq!(c.first_empty_slot(), Some(0));
        assert_eq!(c.free_mass(), None);
    }

    #[test]
    fn test_fits_respects_caps() {
        let mut c = Container::new("locker", 2).with_mass_capacity(1.5);
        assert!(c.fits(&bolt()));
        c.mass_used = 1.0;
        assert!(!c.fits(&bolt()));

        let v = Container::new("crate", 2).with_volume_capacity(1.0);
        assert!(!v.fits(&bolt()));
    }

    #[test]
    fn test_full_container_does_not_fit() {
        let mut c = Container::new("locker", 1);
        assert!(c.store(0, StoredItem::from_descriptor(&bolt())));
        assert!(c.is_full());
        assert!(!c.fits(&bolt()));
    }

    #[test]
    fn test_take_across_slots() {
        let mut c = Container::new("locker", 3);
        let mut stack = StoredItem::from_descriptor(&bolt());
        stack.quantity = 2;
        c.store(0, stack.clone());
        c.store(2, stack);
        assert_eq!(c.mass_used, 4.0);

        assert_eq!(c.take("bolt", 3), 3);
        assert!(c.slots[0].is_none());
        assert_eq!(c.count("bolt"), 1);
        assert_eq!(c.mass_used, 1.0);
        assert_eq!(c.volume_used, 2.0);
    }

    #[test]
    fn test_store_rejects_occupied_or_missing_slot() {
        let mut c = Container::new("locker", 1);
        assert!(c.store(0, StoredItem::from_descriptor(&bolt())));
        assert!(!c.store(0, StoredItem::from_descriptor(&ItemDescriptor::new("nut", 5.0, 5.0))));
        assert!(!c.store(3, StoredItem::from_descriptor(&bolt())));
        assert_eq!(c.count("bolt"), 1);
        assert_eq!(c.count("nut"), 0);
        assert_eq!(c.mass_used, 1.0);
        assert_eq!(c.volume_used, 2.0);
    }

    #[test]
    fn test_usage_returns_exactly_after_take() {
        let mut c = Container::new("locker", 3);
        c.store(0, StoredItem::from_descriptor(&ItemDescriptor::new("wire", 0.1, 0.1)));
        let before = c.clone();

        c.store(1, StoredItem::from_descriptor(&ItemDescriptor::new("panel", 0.2, 0.2)));
        assert_eq!(c.take("panel", 1), 1);
        assert_eq!(c.mass_used, 0.1);
        assert_eq!(c.volume_used, 0.1);
        assert_eq!(c, before);
    }

    #[test]
    fn test_take_missing_item() {
        let mut c = Container::new("locker", 1);
        assert_eq!(c.take("bolt", 2), 0);
    }

    #[test]
    fn test_vessel_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vessel.json");
        let vessel = Vessel {
            name: "Tug".to_string(),
            containers: vec![Container::new("locker", 2).with_volume_capacity(300.0)],
        };
        vessel.save(&path).unwrap();
        assert_eq!(Vessel::load(&path).unwrap(), vessel);
    }
}
