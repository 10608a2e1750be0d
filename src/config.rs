//! Workshop settings loaded from an optional TOML file

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_FILLER;
use crate::models::CatalogItem;

fn default_filler() -> String {
    DEFAULT_FILLER.to_string()
}

fn default_conversion_rate() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Material used to top up recipes whose rates sum below 1
    #[serde(default = "default_filler")]
    pub filler_material: String,

    /// Fraction of each material returned by recycling
    #[serde(default = "default_conversion_rate")]
    pub recycle_conversion_rate: f64,

    /// Drain onboard resources from items put into storage
    #[serde(default = "default_true")]
    pub remove_resources_on_store: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filler_material: default_filler(),
            recycle_conversion_rate: default_conversion_rate(),
            remove_resources_on_store: true,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Load when a path is given and exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Whether storing `item` empties its onboard resources. Both the
    /// workshop setting and the item must allow it.
    pub fn drains_on_store(&self, item: &CatalogItem) -> bool {
        self.remove_resources_on_store && item.remove_resources
    }
}
