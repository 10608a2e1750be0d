//! Data models for catalog entries, requirements and stored items

use serde::{Deserialize, Serialize};

/// Sentinel for an environmental gate that imposes no constraint
pub const UNCONSTRAINED: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub density: f64, // mass per unit of material
}

/// A material's share of a category's default recipe
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialShare {
    pub material: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredComponent {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub name: String,
    pub title: String,
    pub category: String,
    pub mass: f64,
    pub volume: f64,
    pub variant_mass_deltas: Vec<f64>,
    pub special_resources: Vec<MaterialShare>,
    pub required_components: Vec<RequiredComponent>,
    pub onboard_resources: Vec<ResourceSnapshot>,
    pub minimum_gravity: f64,
    pub minimum_pressure: f64,
    pub remove_resources: bool,
}

impl CatalogItem {
    pub fn new(name: &str, category: &str, mass: f64) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            category: category.to_string(),
            mass,
            volume: 0.0,
            variant_mass_deltas: Vec::new(),
            special_resources: Vec::new(),
            required_components: Vec::new(),
            onboard_resources: Vec::new(),
            minimum_gravity: UNCONSTRAINED,
            minimum_pressure: UNCONSTRAINED,
            remove_resources: true,
        }
    }

    /// Mass delta of a variant, zero when the index is out of range
    pub fn variant_delta(&self, variant_index: i32) -> f64 {
        usize::try_from(variant_index)
            .ok()
            .and_then(|idx| self.variant_mass_deltas.get(idx))
            .copied()
            .unwrap_or(0.0)
    }
}

/// One material consumed per unit of fabrication progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub name: String,
    pub rate: f64,
    pub amount: f64, // cached, derived from rate, item mass and density
}

impl ResourceRequirement {
    pub fn new(name: &str, rate: f64) -> Self {
        Self {
            name: name.to_string(),
            rate,
            amount: 0.0,
        }
    }
}

/// Onboard resource carried by a stored item (fuel, charge, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub name: String,
    pub amount: f64,
    pub max_amount: f64,
}

/// What the allocator needs to know about an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub name: String,
    pub unit_mass: f64,
    pub unit_volume: f64,
    #[serde(default)]
    pub resources: Vec<ResourceSnapshot>,
}

impl ItemDescriptor {
    pub fn new(name: &str, unit_mass: f64, unit_volume: f64) -> Self {
        Self {
            name: name.to_string(),
            unit_mass,
            unit_volume,
            resources: Vec::new(),
        }
    }

    pub fn with_resource(mut self, name: &str, amount: f64, max_amount: f64) -> Self {
        self.resources.push(ResourceSnapshot {
            name: name.to_string(),
            amount,
            max_amount,
        });
        self
    }
}
