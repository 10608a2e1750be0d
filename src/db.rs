//! Database schema and operations for the workshop catalog

use anyhow::Result;
use rusqlite::Connection;

use crate::catalog::Catalog;
use crate::models::{CatalogItem, Material, MaterialShare, RequiredComponent, ResourceSnapshot};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Material densities
        CREATE TABLE IF NOT EXISTS materials (
            name TEXT PRIMARY KEY,
            density REAL NOT NULL
        );

        -- Default recipe per item category
        CREATE TABLE IF NOT EXISTS category_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            material TEXT NOT NULL,
            rate REAL NOT NULL
        );

        -- Fabricable items
        CREATE TABLE IF NOT EXISTS items (
            name TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            category TEXT NOT NULL,
            mass REAL NOT NULL,
            volume REAL NOT NULL DEFAULT 0,
            minimum_gravity REAL NOT NULL DEFAULT -1,
            minimum_pressure REAL NOT NULL DEFAULT -1,
            remove_resources INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS item_variants (
            item TEXT NOT NULL,
            idx INTEGER NOT NULL,
            mass_delta REAL NOT NULL,
            PRIMARY KEY (item, idx)
        );

        -- Item-specific resources on top of the category recipe
        CREATE TABLE IF NOT EXISTS item_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item TEXT NOT NULL,
            material TEXT NOT NULL,
            rate REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS item_components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item TEXT NOT NULL,
            name TEXT NOT NULL,
            amount REAL NOT NULL
        );

        -- Resources a stored item carries (fuel, charge, ...)
        CREATE TABLE IF NOT EXISTS item_onboard_resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item TEXT NOT NULL,
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            max_amount REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_materials_category ON category_materials(category);
        CREATE INDEX IF NOT EXISTS idx_item_resources_item ON item_resources(item);
        CREATE INDEX IF NOT EXISTS idx_item_components_item ON item_components(item);
        CREATE INDEX IF NOT EXISTS idx_item_onboard_resources_item ON item_onboard_resources(item);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a material density
pub fn upsert_material(conn: &Connection, material: &Material) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO materials (name, density) VALUES (?1, ?2)",
        (&material.name, material.density),
    )?;
    Ok(())
}

/// Replace a category's default recipe with `shares`
pub fn replace_category(conn: &Connection, category: &str, shares: &[MaterialShare]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute("DELETE FROM category_materials WHERE category = ?1", [category])?;
    for share in shares {
        tx.execute(
            "INSERT INTO category_materials (category, material, rate) VALUES (?1, ?2, ?3)",
            (category, &share.material, share.rate),
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Insert or replace an item together with its variants, resources and components
pub fn upsert_item(conn: &Connection, item: &CatalogItem) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT OR REPLACE INTO items
         (name, title, category, mass, volume, minimum_gravity, minimum_pressure, remove_resources)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            &item.name,
            &item.title,
            &item.category,
            item.mass,
            item.volume,
            item.minimum_gravity,
            item.minimum_pressure,
            item.remove_resources,
        ),
    )?;

    for table in [
        "item_variants",
        "item_resources",
        "item_components",
        "item_onboard_resources",
    ] {
        tx.execute(&format!("DELETE FROM {table} WHERE item = ?1"), [&item.name])?;
    }

    for (idx, delta) in item.variant_mass_deltas.iter().enumerate() {
        tx.execute(
            "INSERT INTO item_variants (item, idx, mass_delta) VALUES (?1, ?2, ?3)",
            (&item.name, idx as i64, delta),
        )?;
    }
    for share in &item.special_resources {
        tx.execute(
            "INSERT INTO item_resources (item, material, rate) VALUES (?1, ?2, ?3)",
            (&item.name, &share.material, share.rate),
        )?;
    }
    for component in &item.required_components {
        tx.execute(
            "INSERT INTO item_components (item, name, amount) VALUES (?1, ?2, ?3)",
            (&item.name, &component.name, component.amount),
        )?;
    }
    for resource in &item.onboard_resources {
        tx.execute(
            "INSERT INTO item_onboard_resources (item, name, amount, max_amount) VALUES (?1, ?2, ?3, ?4)",
            (&item.name, &resource.name, resource.amount, resource.max_amount),
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Clear all catalog data (for re-extraction)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM item_onboard_resources;
        DELETE FROM item_components;
        DELETE FROM item_resources;
        DELETE FROM item_variants;
        DELETE FROM items;
        DELETE FROM category_materials;
        DELETE FROM materials;
        "#,
    )?;
    Ok(())
}

/// List all items, without their child rows
pub fn list_items(conn: &Connection) -> Result<Vec<CatalogItem>> {
    let mut stmt = conn.prepare(
        "SELECT name, title, category, mass, volume, minimum_gravity, minimum_pressure, remove_resources
         FROM items ORDER BY name",
    )?;

    let rows = stmt.query_map([], |row| {
        let mut item = CatalogItem::new(&row.get::<_, String>(0)?, &row.get::<_, String>(2)?, row.get(3)?);
        item.title = row.get(1)?;
        item.volume = row.get(4)?;
        item.minimum_gravity = row.get(5)?;
        item.minimum_pressure = row.get(6)?;
        item.remove_resources = row.get(7)?;
        Ok(item)
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load every table into an in-memory catalog
pub fn load_catalog(conn: &Connection, filler: &str) -> Result<Catalog> {
    let mut catalog = Catalog::new(filler);

    let mut stmt = conn.prepare("SELECT name, density FROM materials")?;
    let rows = stmt.query_map([], |row| {
        Ok(Material {
            name: row.get(0)?,
            density: row.get(1)?,
        })
    })?;
    for row in rows {
        catalog.add_material(row?);
    }

    let mut stmt = conn.prepare("SELECT category, material, rate FROM category_materials ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
    })?;
    for row in rows {
        let (category, material, rate) = row?;
        catalog.add_category_material(&category, &material, rate);
    }

    for mut item in list_items(conn)? {
        item.variant_mass_deltas = query_f64s(
            conn,
            "SELECT mass_delta FROM item_variants WHERE item = ?1 ORDER BY idx",
            &item.name,
        )?;
        item.special_resources = item_shares(conn, &item.name)?;
        item.required_components = item_components(conn, &item.name)?;
        item.onboard_resources = onboard_resources(conn, &item.name)?;
        catalog.add_item(item);
    }

    Ok(catalog)
}

fn query_f64s(conn: &Connection, sql: &str, item: &str) -> Result<Vec<f64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([item], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn item_shares(conn: &Connection, item: &str) -> Result<Vec<MaterialShare>> {
    let mut stmt = conn.prepare("SELECT material, rate FROM item_resources WHERE item = ?1 ORDER BY id")?;
    let rows = stmt.query_map([item], |row| {
        Ok(MaterialShare {
            material: row.get(0)?,
            rate: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn item_components(conn: &Connection, item: &str) -> Result<Vec<RequiredComponent>> {
    let mut stmt = conn.prepare("SELECT name, amount FROM item_components WHERE item = ?1 ORDER BY id")?;
    let rows = stmt.query_map([item], |row| {
        Ok(RequiredComponent {
            name: row.get(0)?,
            amount: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn onboard_resources(conn: &Connection, item: &str) -> Result<Vec<ResourceSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT name, amount, max_amount FROM item_onboard_resources WHERE item = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([item], |row| {
        Ok(ResourceSnapshot {
            name: row.get(0)?,
            amount: row.get(1)?,
            max_amount: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
