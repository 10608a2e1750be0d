//! Fabrication resource ledger and multi-container inventory allocator.
//!
//! Pure data and algorithms: nothing here touches rendering, physics or
//! scene state. The host builds a [`catalog::Catalog`] once and passes it
//! to ledger calls; containers are owned by the host and only mutated by
//! the allocator for the duration of a call.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`allocator`] | First-fit placement, removal and space queries over containers |
//! | [`catalog`] | Item masses, material densities and category recipes |
//! | [`config`] | TOML workshop settings |
//! | [`db`] | SQLite catalog store |
//! | [`error`] | Ledger and allocation errors |
//! | [`extract`] | Part-config importer |
//! | [`inventory`] | Containers, slots and the owning vessel |
//! | [`ledger`] | Build items: requirements, progress, recycling yield |
//! | [`models`] | Shared value types |
//! | [`record`] | Persisted build item records |

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod inventory;
pub mod ledger;
pub mod models;
pub mod record;
