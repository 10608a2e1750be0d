//! Error taxonomy for the ledger and the allocator

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Catalog entry missing or malformed; fatal to the requested construction.
    #[error("catalog lookup failed for '{name}': {reason}")]
    CatalogLookup { name: String, reason: String },

    /// A material has no registered density.
    #[error("no density registered for material '{0}'")]
    UnknownMaterial(String),

    /// One or more materials were skipped while recomputing requirements.
    #[error("requirements computed without {}: no density registered", .0.join(", "))]
    UnknownMaterials(Vec<String>),
}

impl LedgerError {
    pub fn missing_item(name: &str) -> Self {
        LedgerError::CatalogLookup {
            name: name.to_string(),
            reason: "no such catalog entry".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("no container has space for '{item}'")]
    NoSpaceAvailable { item: String },
}
