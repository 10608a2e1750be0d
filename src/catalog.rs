//! In-memory catalog of items, material densities and category recipes
//!
//! Built once at startup (usually by [`crate::db::load_catalog`]) and passed
//! by reference to every ledger and allocator call site.

use std::collections::HashMap;

use crate::error::{LedgerError, Result};
use crate::models::{CatalogItem, ItemDescriptor, Material, MaterialShare};

/// Default bulk feedstock used to top up recipes whose rates sum below 1
pub const DEFAULT_FILLER: &str = "MaterialKits";

#[derive(Debug, Clone)]
pub struct Catalog {
    filler: String,
    densities: HashMap<String, f64>,
    categories: HashMap<String, Vec<MaterialShare>>,
    items: HashMap<String, CatalogItem>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER)
    }
}

impl Catalog {
    pub fn new(filler: &str) -> Self {
        Self {
            filler: filler.to_string(),
            densities: HashMap::new(),
            categories: HashMap::new(),
            items: HashMap::new(),
        }
    }

    pub fn filler(&self) -> &str {
        &self.filler
    }

    pub fn add_material(&mut self, material: Material) {
        self.densities.insert(material.name, material.density);
    }

    /// Append a material to a category's default recipe
    pub fn add_category_material(&mut self, category: &str, material: &str, rate: f64) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(MaterialShare {
                material: material.to_string(),
                rate,
            });
    }

    pub fn add_item(&mut self, item: CatalogItem) {
        self.items.insert(item.name.clone(), item);
    }

    pub fn item(&self, name: &str) -> Result<&CatalogItem> {
        let item = self
            .items
            .get(name)
            .ok_or_else(|| LedgerError::missing_item(name))?;

        if !item.mass.is_finite() || item.mass <= 0.0 {
            return Err(LedgerError::CatalogLookup {
                name: name.to_string(),
                reason: format!("invalid mass {}", item.mass),
            });
        }
        Ok(item)
    }

    pub fn density(&self, material: &str) -> Result<f64> {
        self.densities
            .get(material)
            .copied()
            .filter(|d| *d > 0.0)
            .ok_or_else(|| LedgerError::UnknownMaterial(material.to_string()))
    }

    pub fn has_density(&self, material: &str) -> bool {
        self.density(material).is_ok()
    }

    /// Default recipe for a category, empty when the category is unknown
    pub fn category_materials(&self, category: &str) -> &[MaterialShare] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mass, volume and onboard resources of one unit of an item, as
    /// handed to the allocator
    pub fn descriptor(&self, name: &str) -> Result<ItemDescriptor> {
        let item = self.item(name)?;
        let mut descriptor = ItemDescriptor::new(&item.name, item.mass, item.volume);
        descriptor.resources = item.onboard_resources.clone();
        Ok(descriptor)
    }
}
