//! Workshop Ledger
//!
//! Command-line front end for the fabrication ledger and the vessel
//! inventory allocator.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use workshop_ledger::allocator;
use workshop_ledger::catalog::Catalog;
use workshop_ledger::config::Settings;
use workshop_ledger::db;
use workshop_ledger::error::AllocationError;
use workshop_ledger::extract;
use workshop_ledger::inventory::Vessel;
use workshop_ledger::ledger::BuildItem;
use workshop_ledger::models::{CatalogItem, Material, MaterialShare, RequiredComponent, ResourceSnapshot};
use workshop_ledger::record;

#[derive(Parser)]
#[command(name = "workshop-ledger")]
#[command(about = "Fabrication resource ledger and vessel inventory allocator")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, default_value = "workshop.db")]
    database: PathBuf,

    /// Path to the TOML settings file
    #[arg(short, long, default_value = "workshop.toml")]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import materials, categories and parts from a directory of .cfg files
    Extract {
        /// Directory to scan
        source_dir: PathBuf,

        /// Clear existing catalog before extraction
        #[arg(long)]
        clear: bool,
    },

    /// List all items in the catalog
    ListItems,

    /// Show details for a catalog item
    Item {
        /// Item name
        name: String,
    },

    /// Compute the resource requirements for building an item
    Plan {
        /// Item name
        item: String,

        /// Variant index
        #[arg(short, long, default_value = "0")]
        variant: i32,

        /// Print the persisted record instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Store finished items in a vessel's containers
    Store {
        /// Vessel inventory file (JSON)
        vessel: PathBuf,

        /// Item name
        item: String,

        /// Number of units to store
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Index of the preferred container
        #[arg(short, long)]
        preferred: Option<usize>,
    },

    /// Remove items from a vessel and report the recovered materials
    Recycle {
        /// Vessel inventory file (JSON)
        vessel: PathBuf,

        /// Item name
        item: String,

        /// Number of units to recycle
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },

    /// Show what a vessel's containers hold
    Stock {
        /// Vessel inventory file (JSON)
        vessel: PathBuf,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without part configs)
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("workshop_ledger={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::load_or_default(Some(cli.config.as_path()))?;
    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Extract { source_dir, clear } => {
            if clear {
                println!("Clearing existing catalog...");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::extract_to_database(&conn, &source_dir)?;
            println!("{}", stats);
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'extract' or 'load-sample' first.");
            } else {
                println!("{:<24} {:<16} {:>10} {:>10}", "Item", "Category", "Mass", "Volume");
                println!("{}", "-".repeat(63));
                for item in items {
                    println!(
                        "{:<24} {:<16} {:>10.4} {:>10.1}",
                        item.name, item.category, item.mass, item.volume
                    );
                }
            }
        }

        Commands::Item { name } => {
            let catalog = db::load_catalog(&conn, &settings.filler_material)?;
            let item = catalog.item(&name)?;
            print_item(item);
        }

        Commands::Plan { item, variant, json } => {
            let catalog = db::load_catalog(&conn, &settings.filler_material)?;
            let plan = BuildItem::from_catalog_entry(&catalog, &item, variant)?;

            if json {
                println!("{}", record::save_string(&plan.item)?);
            } else {
                print_plan(&plan.item);
            }
            for name in &plan.unknown_materials {
                eprintln!("warning: no density for '{}', not counted", name);
            }
        }

        Commands::Store {
            vessel,
            item,
            count,
            preferred,
        } => {
            let catalog = db::load_catalog(&conn, &settings.filler_material)?;
            store_items(&catalog, &settings, &vessel, &item, count, preferred)?;
        }

        Commands::Recycle {
            vessel,
            item,
            count,
        } => {
            let catalog = db::load_catalog(&conn, &settings.filler_material)?;
            recycle_items(&catalog, &settings, &vessel, &item, count)?;
        }

        Commands::Stock { vessel } => {
            let vessel = Vessel::load(&vessel)?;
            print_stock(&vessel);
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn print_item(item: &CatalogItem) {
    println!("Item: {}", item.title);
    println!("  Name: {}", item.name);
    println!("  Category: {}", item.category);
    println!("  Mass: {}", item.mass);
    println!("  Volume: {}", item.volume);
    if item.minimum_gravity >= 0.0 {
        println!("  Minimum gravity: {}", item.minimum_gravity);
    }
    if item.minimum_pressure >= 0.0 {
        println!("  Minimum pressure: {}", item.minimum_pressure);
    }
    if !item.variant_mass_deltas.is_empty() {
        println!("  Variants:");
        for (idx, delta) in item.variant_mass_deltas.iter().enumerate() {
            println!("    [{}] {:+}", idx, delta);
        }
    }
    if !item.special_resources.is_empty() {
        println!("  Special resources:");
        for share in &item.special_resources {
            println!("    {} @ {}", share.material, share.rate);
        }
    }
    if !item.required_components.is_empty() {
        println!("  Components:");
        for component in &item.required_components {
            println!("    {}x {}", component.amount, component.name);
        }
    }
    if !item.onboard_resources.is_empty() {
        println!("  Onboard:");
        for resource in &item.onboard_resources {
            println!("    {} {}/{}", resource.name, resource.amount, resource.max_amount);
        }
    }
    if !item.remove_resources {
        println!("  Keeps onboard resources in storage");
    }
}

fn print_plan(item: &BuildItem) {
    println!("=== Build plan: {} (variant {}) ===", item.item_name, item.variant_index);
    println!("{:<20} {:>8} {:>12}", "Material", "Rate", "Units");
    println!("{}", "-".repeat(42));
    for material in &item.materials {
        println!(
            "{:<20} {:>8.3} {:>12.3}",
            material.name, material.rate, material.amount
        );
    }
    println!("{}", "-".repeat(42));
    println!("{:<20} {:>8.3} {:>12.3}", "Total", item.rate_total(), item.total_units_required);

    if !item.required_components.is_empty() {
        println!();
        println!("Components:");
        for component in &item.required_components {
            println!("  {}x {}", component.amount, component.name);
        }
    }
}

fn store_items(
    catalog: &Catalog,
    settings: &Settings,
    path: &Path,
    item_name: &str,
    count: u32,
    preferred: Option<usize>,
) -> Result<()> {
    let mut vessel = Vessel::load(path)?;
    let descriptor = catalog.descriptor(item_name)?;
    let remove_resources = settings.drains_on_store(catalog.item(item_name)?);

    if !allocator::has_aggregate_space(&vessel.containers, &descriptor, count) {
        bail!(
            "{} has no room for {} x {} across its containers",
            vessel.name,
            count,
            item_name
        );
    }

    for _ in 0..count {
        match allocator::place_item(&mut vessel.containers, preferred, &descriptor, remove_resources) {
            Ok(idx) => println!("Stored {} in {}", item_name, vessel.containers[idx].name),
            Err(AllocationError::NoSpaceAvailable { .. }) => {
                println!("No space left for {}", item_name);
                break;
            }
        }
    }

    vessel.save(path)
}

fn recycle_items(
    catalog: &Catalog,
    settings: &Settings,
    path: &Path,
    item_name: &str,
    count: u32,
) -> Result<()> {
    let mut vessel = Vessel::load(path)?;
    let removed = allocator::remove_units(&mut vessel.containers, item_name, count);
    if removed < count {
        println!("Only {} of {} x {} found", removed, count, item_name);
    }
    if removed == 0 {
        return Ok(());
    }

    let mut item = BuildItem::from_catalog_entry(catalog, item_name, 0)?.into_item();
    item.is_being_recycled = true;

    println!("Recycled {} x {}:", removed, item_name);
    for (material, units) in item.recycle_yield(settings.recycle_conversion_rate) {
        println!("  {} @ {:.3} units", material, units * f64::from(removed));
    }

    vessel.save(path)
}

fn print_stock(vessel: &Vessel) {
    println!("=== {} ===", vessel.name);
    for (idx, container) in vessel.containers.iter().enumerate() {
        let mass = match container.mass_capacity {
            Some(cap) => format!("{:.3}/{:.3}", container.mass_used, cap),
            None => format!("{:.3}", container.mass_used),
        };
        let volume = match container.volume_capacity {
            Some(cap) => format!("{:.1}/{:.1}", container.volume_used, cap),
            None => format!("{:.1}", container.volume_used),
        };
        println!("[{}] {} (mass {}, volume {})", idx, container.name, mass, volume);
        for stack in container.stacks() {
            println!("    {}x {}", stack.quantity, stack.name);
            for resource in &stack.resources {
                println!("        {} {}/{}", resource.name, resource.amount, resource.max_amount);
            }
        }
    }

    let units = allocator::harvest_recyclable(&vessel.containers);
    println!();
    println!("{} recyclable units", units.len());
}

/// Load sample workshop data for testing without part configs
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalog(conn)?;

    for (name, density) in [
        ("MaterialKits", 0.005),
        ("MetalOre", 0.004),
        ("Graphite", 0.0022),
        ("ElectricCharge", 0.001),
    ] {
        db::upsert_material(
            conn,
            &Material {
                name: name.to_string(),
                density,
            },
        )?;
    }

    let share = |material: &str, rate: f64| MaterialShare {
        material: material.to_string(),
        rate,
    };
    db::replace_category(conn, "Structural", &[share("MetalOre", 0.7)])?;
    db::replace_category(conn, "FuelTank", &[share("MetalOre", 0.5), share("Graphite", 0.2)])?;
    db::replace_category(
        conn,
        "Electrical",
        &[share("MetalOre", 0.3), share("MaterialKits", 0.2)],
    )?;
    db::replace_category(conn, "Pods", &[share("Graphite", 0.4)])?;

    // Cubic strut: plain structural part
    let mut strut = CatalogItem::new("strutCube", "Structural", 0.001);
    strut.title = "Cubic Octagonal Strut".to_string();
    strut.volume = 8.0;
    db::upsert_item(conn, &strut)?;

    // Small tank with length variants
    let mut tank = CatalogItem::new("fuelTank", "FuelTank", 0.0625);
    tank.title = "FL-T100 Fuel Tank".to_string();
    tank.volume = 180.0;
    tank.variant_mass_deltas = vec![0.0, 0.0625, 0.125];
    db::upsert_item(conn, &tank)?;

    // Battery keeps its charge out of storage
    let mut battery = CatalogItem::new("batteryPack", "Electrical", 0.005);
    battery.title = "Z-100 Battery Pack".to_string();
    battery.volume = 5.0;
    battery.special_resources.push(share("ElectricCharge", 0.1));
    battery.onboard_resources.push(ResourceSnapshot {
        name: "ElectricCharge".to_string(),
        amount: 100.0,
        max_amount: 100.0,
    });
    battery.remove_resources = false;
    db::upsert_item(conn, &battery)?;

    // Probe core needs gravity, pressure and a guidance unit
    let mut probe = CatalogItem::new("probeCoreSphere", "Pods", 0.1);
    probe.title = "Stayputnik Mk. 1".to_string();
    probe.volume = 60.0;
    probe.minimum_gravity = 0.1;
    probe.minimum_pressure = 0.5;
    probe.required_components.push(RequiredComponent {
        name: "GuidanceUnit".to_string(),
        amount: 1.0,
    });
    db::upsert_item(conn, &probe)?;

    println!("Loaded {} sample items", 4);
    Ok(())
}
