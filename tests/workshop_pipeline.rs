//! Integration tests for the fabrication pipeline.
//!
//! Exercises: part configs → SQLite catalog → Catalog → BuildItem
//! → persisted record → vessel containers
//!
//! All tests are pure logic over an in-memory database.

use std::fs;

use rusqlite::Connection;
use workshop_ledger::allocator::{
    count_units, find_container_with_space, has_aggregate_space, harvest_recyclable, place_item,
    remove_units,
};
use workshop_ledger::catalog::Catalog;
use workshop_ledger::config::Settings;
use workshop_ledger::db;
use workshop_ledger::error::AllocationError;
use workshop_ledger::extract::extract_to_database;
use workshop_ledger::inventory::{Container, Vessel};
use workshop_ledger::ledger::BuildItem;
use workshop_ledger::models::{CatalogItem, Material};
use workshop_ledger::record;

// ── Helpers ────────────────────────────────────────────────────────────

const CATALOG_CFG: &str = r#"
WORKSHOP_MATERIAL
{
    name = SteelAlloy
    density = 2.0
}
WORKSHOP_MATERIAL
{
    name = Filler
    density = 0.5
}
WORKSHOP_CATEGORY
{
    name = structural
    material = SteelAlloy, 0.6
}
PART
{
    name = girder
    category = structural
    mass = 10
    volume = 25
    VARIANT
    {
        massOffset = 0
    }
    VARIANT
    {
        massOffset = 5
    }
}
PART
{
    name = cell
    category = structural
    mass = 1
    volume = 2
    RESOURCE
    {
        name = ElectricCharge
        amount = 40
        maxAmount = 50
    }
}
PART
{
    name = capacitor
    category = structural
    mass = 1
    volume = 2
    removeResources = false
    RESOURCE
    {
        name = ElectricCharge
        maxAmount = 50
    }
}
"#;

fn extracted_catalog() -> Catalog {
    extracted_catalog_after(1)
}

/// Catalog after running the importer `runs` times over the same directory
fn extracted_catalog_after(runs: usize) -> Catalog {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("catalog.cfg"), CATALOG_CFG).unwrap();

    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    for _ in 0..runs {
        extract_to_database(&conn, dir.path()).unwrap();
    }
    db::load_catalog(&conn, "Filler").unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Ledger ─────────────────────────────────────────────────────────────

#[test]
fn structural_entry_gets_filler_top_up() {
    let catalog = extracted_catalog();
    let plan = BuildItem::from_catalog_entry(&catalog, "girder", 0).unwrap();
    assert!(plan.unknown_materials.is_empty());

    let item = plan.item;
    assert_eq!(item.materials.len(), 2);
    assert_eq!(item.materials[0].name, "SteelAlloy");
    assert!(close(item.materials[0].rate, 0.6));
    assert_eq!(item.materials[1].name, "Filler");
    assert!(close(item.materials[1].rate, 0.4));
    assert!(close(
        item.total_units_required,
        (10.0 / 2.0) * 0.6 + (10.0 / 0.5) * 0.4
    ));
}

#[test]
fn reimport_keeps_filler_top_up() {
    let once = BuildItem::from_catalog_entry(&extracted_catalog(), "girder", 0)
        .unwrap()
        .into_item();
    let twice = BuildItem::from_catalog_entry(&extracted_catalog_after(2), "girder", 0)
        .unwrap()
        .into_item();

    assert_eq!(twice, once);
    assert_eq!(twice.materials.len(), 2);
    assert_eq!(twice.materials[1].name, "Filler");
    assert!(close(twice.materials[1].rate, 0.4));
}

#[test]
fn variant_mass_flows_into_requirements() {
    let catalog = extracted_catalog();
    let heavy = BuildItem::from_catalog_entry(&catalog, "girder", 1)
        .unwrap()
        .into_item();
    assert!(close(heavy.item_mass(&catalog).unwrap(), 15.0));
    assert!(close(
        heavy.total_units_required,
        (15.0 / 2.0) * 0.6 + (15.0 / 0.5) * 0.4
    ));
}

#[test]
fn missing_filler_density_is_reported_not_fatal() {
    let mut catalog = Catalog::new("Scrap");
    catalog.add_material(Material {
        name: "SteelAlloy".to_string(),
        density: 2.0,
    });
    catalog.add_category_material("structural", "SteelAlloy", 0.6);
    catalog.add_item(CatalogItem::new("girder", "structural", 10.0));

    let plan = BuildItem::from_catalog_entry(&catalog, "girder", 0).unwrap();
    assert_eq!(plan.unknown_materials, vec!["Scrap".to_string()]);
    assert!(plan.item.rate_total() >= 1.0 - 1e-9);
    assert!(close(plan.item.total_units_required, 3.0));
}

#[test]
fn saved_job_resumes_with_progress() {
    let catalog = extracted_catalog();
    let mut job = BuildItem::from_catalog_entry(&catalog, "girder", 1)
        .unwrap()
        .into_item();
    job.record_progress(4.25);

    let text = record::save_string(&job).unwrap();
    let mut resumed = record::restore_str(&text);
    assert_eq!(resumed, job);

    resumed.recompute_requirements(&catalog).unwrap();
    assert_eq!(resumed, job);
}

// ── Allocator ──────────────────────────────────────────────────────────

#[test]
fn finished_item_is_stored_and_recycled() {
    let catalog = extracted_catalog();
    let girder = catalog.descriptor("girder").unwrap();

    let mut vessel = Vessel {
        name: "Workshop Tug".to_string(),
        containers: vec![
            Container::new("radial", 1).with_volume_capacity(10.0),
            Container::new("bay", 4).with_volume_capacity(60.0),
            Container::new("hold", 8),
        ],
    };
    assert_eq!(find_container_with_space(&vessel.containers, &girder), Some(1));
    assert!(has_aggregate_space(&vessel.containers, &girder, 2));
    assert!(!has_aggregate_space(&vessel.containers, &girder, 3));

    for expected in [1, 1, 2] {
        assert_eq!(
            place_item(&mut vessel.containers, None, &girder, true),
            Ok(expected)
        );
    }
    assert_eq!(count_units(&vessel.containers, "girder"), 3);
    assert_eq!(harvest_recyclable(&vessel.containers).len(), 3);

    assert_eq!(remove_units(&mut vessel.containers, "girder", 5), 3);
    assert!(vessel.containers.iter().all(Container::is_empty));
    assert!(vessel.containers.iter().all(|c| c.volume_used == 0.0));
}

#[test]
fn placement_failure_is_a_value() {
    let catalog = extracted_catalog();
    let girder = catalog.descriptor("girder").unwrap();
    let mut containers = vec![Container::new("radial", 2).with_volume_capacity(10.0)];

    let result = place_item(&mut containers, Some(0), &girder, true);
    assert!(matches!(result, Err(AllocationError::NoSpaceAvailable { .. })));
    assert!(containers[0].is_empty());
}

#[test]
fn storing_drains_onboard_resources_unless_item_keeps_them() {
    let catalog = extracted_catalog();
    let settings = Settings::default();
    let mut containers = vec![Container::new("bay", 4)];

    for name in ["cell", "capacitor"] {
        let descriptor = catalog.descriptor(name).unwrap();
        assert_eq!(descriptor.resources.len(), 1);
        let drain = settings.drains_on_store(catalog.item(name).unwrap());
        place_item(&mut containers, None, &descriptor, drain).unwrap();
    }

    let cell = containers[0].slots[0].as_ref().unwrap();
    assert_eq!(cell.name, "cell");
    assert_eq!(cell.resources[0].amount, 0.0);
    assert_eq!(cell.resources[0].max_amount, 50.0);

    let capacitor = containers[0].slots[1].as_ref().unwrap();
    assert_eq!(capacitor.name, "capacitor");
    assert_eq!(capacitor.resources[0].amount, 50.0);
}
