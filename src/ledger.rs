//! Build-item resource ledger
//!
//! A [`BuildItem`] tracks what a single fabrication (or recycling) job
//! consumes: the materials and their rate-weighted unit amounts, discrete
//! components, environmental gates and printing progress.

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{LedgerError, Result};
use crate::models::{RequiredComponent, ResourceRequirement, UNCONSTRAINED};

#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    pub item_name: String,
    pub materials: Vec<ResourceRequirement>,
    pub required_components: Vec<RequiredComponent>,
    pub total_units_required: f64,
    pub total_units_printed: f64,
    pub is_being_recycled: bool,
    pub minimum_gravity: f64,
    pub minimum_pressure: f64,
    pub remove_resources: bool,
    pub variant_index: i32,
}

impl Default for BuildItem {
    fn default() -> Self {
        Self {
            item_name: String::new(),
            materials: Vec::new(),
            required_components: Vec::new(),
            total_units_required: 0.0,
            total_units_printed: 0.0,
            is_being_recycled: false,
            minimum_gravity: UNCONSTRAINED,
            minimum_pressure: UNCONSTRAINED,
            remove_resources: true,
            variant_index: 0,
        }
    }
}

/// A freshly queued item plus the materials that could not be costed
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub item: BuildItem,
    pub unknown_materials: Vec<String>,
}

impl BuildPlan {
    pub fn into_item(self) -> BuildItem {
        self.item
    }
}

impl BuildItem {
    /// Build the ledger for a new fabrication job from a catalog entry.
    ///
    /// Fails only when the entry itself is missing or malformed. Materials
    /// without a registered density are reported in
    /// [`BuildPlan::unknown_materials`] and contribute nothing to the total.
    pub fn from_catalog_entry(
        catalog: &Catalog,
        item_name: &str,
        variant_index: i32,
    ) -> Result<BuildPlan> {
        let entry = catalog.item(item_name)?;

        let mut materials: Vec<ResourceRequirement> = catalog
            .category_materials(&entry.category)
            .iter()
            .filter(|share| catalog.has_density(&share.material))
            .map(|share| ResourceRequirement::new(&share.material, share.rate))
            .collect();

        for special in &entry.special_resources {
            materials.push(ResourceRequirement::new(&special.material, special.rate));
        }

        top_up_with_filler(&mut materials, catalog.filler());

        let mut item = BuildItem {
            item_name: entry.name.clone(),
            materials,
            required_components: entry.required_components.clone(),
            minimum_gravity: entry.minimum_gravity,
            minimum_pressure: entry.minimum_pressure,
            remove_resources: entry.remove_resources,
            variant_index,
            ..Default::default()
        };

        let unknown_materials = match item.recompute_requirements(catalog) {
            Ok(()) => Vec::new(),
            Err(LedgerError::UnknownMaterials(names)) => names,
            Err(e) => return Err(e),
        };
        item.total_units_printed = 0.0;

        debug!(
            item = %item.item_name,
            variant = variant_index,
            units = item.total_units_required,
            "queued build item"
        );

        Ok(BuildPlan {
            item,
            unknown_materials,
        })
    }

    /// Entry mass plus the selected variant's delta
    pub fn item_mass(&self, catalog: &Catalog) -> Result<f64> {
        let entry = catalog.item(&self.item_name)?;
        Ok(entry.mass + entry.variant_delta(self.variant_index))
    }

    /// Recompute every material amount and the required total.
    ///
    /// Materials without a density are left at zero and named in the
    /// returned `UnknownMaterials` error once all others are computed.
    pub fn recompute_requirements(&mut self, catalog: &Catalog) -> Result<()> {
        let mass = self.item_mass(catalog)?;
        let mut skipped = Vec::new();
        let mut total = 0.0;

        for material in &mut self.materials {
            match catalog.density(&material.name) {
                Ok(density) => {
                    material.amount = (mass / density) * material.rate;
                    total += material.amount;
                }
                Err(_) => {
                    material.amount = 0.0;
                    skipped.push(material.name.clone());
                }
            }
        }
        self.total_units_required = total;

        if skipped.is_empty() {
            Ok(())
        } else {
            warn!(item = %self.item_name, materials = ?skipped, "skipped materials without density");
            Err(LedgerError::UnknownMaterials(skipped))
        }
    }

    /// Switch variant and recompute requirements for the new mass
    pub fn select_variant(&mut self, catalog: &Catalog, variant_index: i32) -> Result<()> {
        self.variant_index = variant_index;
        self.recompute_requirements(catalog)
    }

    pub fn rate_total(&self) -> f64 {
        self.materials.iter().map(|m| m.rate).sum()
    }

    /// Add printed units. Not clamped; staying within the requirement is
    /// the caller's job.
    pub fn record_progress(&mut self, units: f64) {
        self.total_units_printed += units;
    }

    pub fn remaining_units(&self) -> f64 {
        (self.total_units_required - self.total_units_printed).max(0.0)
    }

    /// Fraction printed, 0 when nothing is required
    pub fn progress(&self) -> f64 {
        if self.total_units_required <= 0.0 {
            0.0
        } else {
            (self.total_units_printed / self.total_units_required).clamp(0.0, 1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_units_required > 0.0 && self.total_units_printed >= self.total_units_required
    }

    /// Whether the observed gravity and pressure satisfy the item's gates
    pub fn environment_allows(&self, gravity: f64, pressure: f64) -> bool {
        gate_allows(self.minimum_gravity, gravity) && gate_allows(self.minimum_pressure, pressure)
    }

    /// Units of each material returned when this item is recycled
    pub fn recycle_yield(&self, conversion_rate: f64) -> Vec<(String, f64)> {
        self.materials
            .iter()
            .map(|m| (m.name.clone(), m.amount * conversion_rate))
            .collect()
    }
}

fn gate_allows(gate: f64, observed: f64) -> bool {
    gate < 0.0 || observed >= gate
}

/// Raise the rate sum to 1 by growing (or adding) the filler entry
fn top_up_with_filler(materials: &mut Vec<ResourceRequirement>, filler: &str) {
    let sum: f64 = materials.iter().map(|m| m.rate).sum();
    if sum >= 1.0 {
        return;
    }

    let missing = 1.0 - sum;
    match materials.iter_mut().find(|m| m.name == filler) {
        Some(existing) => existing.rate += missing,
        None => materials.push(ResourceRequirement::new(filler, missing)),
    }
}
