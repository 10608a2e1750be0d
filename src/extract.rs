//! Part-config extraction for the workshop catalog
//!
//! Reads `*.cfg` files in the nested `NAME { key = value ... }` format used
//! by part definitions and imports materials, category recipes and parts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{CatalogItem, Material, MaterialShare, RequiredComponent, ResourceSnapshot};

/// A parsed `NAME { ... }` block
#[derive(Debug, Default)]
struct ConfigNode {
    values: Vec<(String, String)>,
    children: Vec<(String, ConfigNode)>,
}

impl ConfigNode {
    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.values
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.to_ascii_lowercase().parse().ok())
    }

    fn nodes<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ConfigNode> {
        self.children
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, node)| node)
    }
}

/// Split `text` into its values and child blocks
fn parse_node(text: &str, value_re: &Regex) -> Result<ConfigNode> {
    let mut node = ConfigNode::default();
    let mut flat = String::new();
    let mut depth = 0usize;
    let mut open = 0usize;
    let mut name = String::new();

    for (pos, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    let trimmed = flat.trim_end();
                    let header = trimmed.rsplit(char::is_whitespace).next().unwrap_or("");
                    let split = trimmed.len() - header.len();
                    name = header.to_string();
                    flat.truncate(split);
                    open = pos + 1;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    bail!("unbalanced '}}' at byte {pos}");
                }
                depth -= 1;
                if depth == 0 {
                    let child = parse_node(&text[open..pos], value_re)?;
                    node.children.push((std::mem::take(&mut name), child));
                    flat.push('\n');
                }
            }
            _ if depth == 0 => flat.push(ch),
            _ => {}
        }
    }
    if depth != 0 {
        bail!("unterminated block '{name}'");
    }

    for cap in value_re.captures_iter(&flat) {
        node.values.push((cap[1].to_string(), cap[2].trim().to_string()));
    }
    Ok(node)
}

/// Find all `*.cfg` files below a directory
pub fn find_config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut configs = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "cfg") {
            configs.push(path.to_path_buf());
        }
    }
    configs.sort();

    Ok(configs)
}

fn parse_config_file(filepath: &Path) -> Result<ConfigNode> {
    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read {}", filepath.display()))?;

    let comment_re = Regex::new(r"//[^\n]*")?;
    let value_re = Regex::new(r"(?m)^\s*(\w+)\s*=\s*(.*?)\s*$")?;

    let stripped = comment_re.replace_all(&content, "");
    parse_node(&stripped, &value_re).with_context(|| format!("Failed to parse {}", filepath.display()))
}

fn part_from_node(node: &ConfigNode) -> Option<CatalogItem> {
    let name = node.get("name").filter(|n| !n.is_empty())?;
    let category = node.get("category").unwrap_or("none");
    let mut item = CatalogItem::new(name, category, node.number("mass").unwrap_or(0.0));

    if let Some(title) = node.get("title") {
        item.title = title.to_string();
    }
    if let Some(volume) = node.number("volume") {
        item.volume = volume;
    }
    if let Some(gravity) = node.number("minimumGravity") {
        item.minimum_gravity = gravity;
    }
    if let Some(pressure) = node.number("minimumPressure") {
        item.minimum_pressure = pressure;
    }
    if let Some(remove) = node.flag("removeResources") {
        item.remove_resources = remove;
    }

    item.variant_mass_deltas = node
        .nodes("VARIANT")
        .map(|v| v.number("massOffset").unwrap_or(0.0))
        .collect();

    item.special_resources = node
        .nodes("WORKSHOP_RESOURCE")
        .filter_map(|r| {
            Some(MaterialShare {
                material: r.get("name")?.to_string(),
                rate: r.number("rate")?,
            })
        })
        .collect();

    item.required_components = node
        .nodes("WORKSHOP_COMPONENT")
        .filter_map(|c| {
            Some(RequiredComponent {
                name: c.get("name")?.to_string(),
                amount: c.number("amount").unwrap_or(1.0),
            })
        })
        .collect();

    // A missing amount means the part ships full
    item.onboard_resources = node
        .nodes("RESOURCE")
        .filter_map(|r| {
            let max_amount = r.number("maxAmount")?;
            Some(ResourceSnapshot {
                name: r.get("name")?.to_string(),
                amount: r.number("amount").unwrap_or(max_amount),
                max_amount,
            })
        })
        .collect();

    Some(item)
}

/// Parse `material = Name, rate` lines of a category block
fn category_shares(node: &ConfigNode) -> Vec<MaterialShare> {
    node.get_all("material")
        .filter_map(|line| {
            let (material, rate) = line.split_once(',')?;
            Some(MaterialShare {
                material: material.trim().to_string(),
                rate: rate.trim().parse().ok()?,
            })
        })
        .collect()
}

/// Extract all catalog data from a directory and populate the database
pub fn extract_to_database(conn: &Connection, dir: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    info!(dir = %dir.display(), "scanning for part configs");
    let config_files = find_config_files(dir)?;
    info!(count = config_files.len(), "found config files");

    for filepath in &config_files {
        let root = match parse_config_file(filepath) {
            Ok(root) => root,
            Err(e) => {
                warn!(file = %filepath.display(), error = %e, "skipping config file");
                stats.errors += 1;
                continue;
            }
        };
        stats.files += 1;

        for node in root.nodes("WORKSHOP_MATERIAL") {
            match (node.get("name"), node.number("density")) {
                (Some(name), Some(density)) => {
                    db::upsert_material(
                        conn,
                        &Material {
                            name: name.to_string(),
                            density,
                        },
                    )?;
                    stats.materials += 1;
                }
                _ => stats.skipped += 1,
            }
        }

        for node in root.nodes("WORKSHOP_CATEGORY") {
            let Some(category) = node.get("name") else {
                stats.skipped += 1;
                continue;
            };
            db::replace_category(conn, category, &category_shares(node))?;
            stats.categories += 1;
        }

        for node in root.nodes("PART") {
            match part_from_node(node) {
                Some(item) => {
                    debug!(
                        part = %item.name,
                        mass = item.mass,
                        variants = item.variant_mass_deltas.len(),
                        "parsed part"
                    );
                    db::upsert_item(conn, &item)?;
                    stats.parts += 1;
                }
                None => stats.skipped += 1,
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub files: usize,
    pub materials: usize,
    pub categories: usize,
    pub parts: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read {} files: {} materials, {} categories, {} parts. Skipped: {}, Errors: {}",
            self.files, self.materials, self.categories, self.parts, self.skipped, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART_CFG: &str = r#"
// Structural strut
PART
{
    name = strutCube
    title = Cubic Octagonal Strut
    category = Structural
    mass = 0.5
    volume = 12
    minimumGravity = 0.1
    removeResources = False
    VARIANT
    {
        massOffset = 0.25
    }
    VARIANT
    {
        massOffset = 0.5
    }
    WORKSHOP_RESOURCE
    {
        name = Graphite
        rate = 0.05
    }
    WORKSHOP_COMPONENT
    {
        name = Bolts
        amount = 4
    }
    RESOURCE
    {
        name = ElectricCharge
        amount = 5
        maxAmount = 10
    }
    RESOURCE
    {
        name = Oxidizer
        maxAmount = 8
    }
    RESOURCE
    {
        name = Broken
    }
}
"#;

    const MATERIALS_CFG: &str = r#"
WORKSHOP_MATERIAL
{
    name = MaterialKits
    density = 0.5
}
WORKSHOP_MATERIAL
{
    name = MetalOre
}
WORKSHOP_CATEGORY
{
    name = Structural
    material = MetalOre, 0.6
    material = Graphite, 0.1
    material = broken
}
"#;

    fn value_re() -> Regex {
        Regex::new(r"(?m)^\s*(\w+)\s*=\s*(.*?)\s*$").unwrap()
    }

    #[test]
    fn test_parse_nested_part() {
        let root = parse_node(PART_CFG, &value_re()).unwrap();
        let part = root.nodes("PART").next().unwrap();
        assert_eq!(part.get("name"), Some("strutCube"));
        assert_eq!(part.nodes("VARIANT").count(), 2);

        let item = part_from_node(part).unwrap();
        assert_eq!(item.title, "Cubic Octagonal Strut");
        assert_eq!(item.mass, 0.5);
        assert_eq!(item.volume, 12.0);
        assert_eq!(item.variant_mass_deltas, vec![0.25, 0.5]);
        assert_eq!(item.special_resources[0].material, "Graphite");
        assert_eq!(item.required_components[0].amount, 4.0);
        assert_eq!(item.minimum_gravity, 0.1);
        assert_eq!(item.minimum_pressure, -1.0);
        assert!(!item.remove_resources);

        assert_eq!(
            item.onboard_resources,
            vec![
                ResourceSnapshot {
                    name: "ElectricCharge".to_string(),
                    amount: 5.0,
                    max_amount: 10.0,
                },
                ResourceSnapshot {
                    name: "Oxidizer".to_string(),
                    amount: 8.0,
                    max_amount: 8.0,
                },
            ]
        );
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        assert!(parse_node("PART { name = x", &value_re()).is_err());
        assert!(parse_node("name = x }", &value_re()).is_err());
    }

    #[test]
    fn test_part_without_name_is_skipped() {
        let root = parse_node("PART\n{\n mass = 1\n}\n", &value_re()).unwrap();
        assert!(part_from_node(root.nodes("PART").next().unwrap()).is_none());
    }

    #[test]
    fn test_extract_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Parts")).unwrap();
        fs::write(dir.path().join("Parts/strut.cfg"), PART_CFG).unwrap();
        fs::write(dir.path().join("materials.cfg"), MATERIALS_CFG).unwrap();
        fs::write(dir.path().join("broken.cfg"), "PART {").unwrap();
        fs::write(dir.path().join("readme.txt"), "PART { name = nope }").unwrap();

        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let stats = extract_to_database(&conn, dir.path()).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.parts, 1);
        assert_eq!(stats.materials, 1);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.skipped, 1);

        let catalog = db::load_catalog(&conn, "MaterialKits").unwrap();
        assert_eq!(catalog.category_materials("Structural").len(), 2);
        assert_eq!(catalog.item("strutCube").unwrap().variant_mass_deltas.len(), 2);
        assert_eq!(catalog.descriptor("strutCube").unwrap().resources.len(), 2);
    }

    #[test]
    fn test_reextract_keeps_category_recipe() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("strut.cfg"), PART_CFG).unwrap();
        fs::write(dir.path().join("materials.cfg"), MATERIALS_CFG).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        extract_to_database(&conn, dir.path()).unwrap();
        let first = db::load_catalog(&conn, "MaterialKits").unwrap();
        extract_to_database(&conn, dir.path()).unwrap();
        let second = db::load_catalog(&conn, "MaterialKits").unwrap();

        assert_eq!(
            second.category_materials("Structural"),
            first.category_materials("Structural")
        );
        assert_eq!(second.category_materials("Structural").len(), 2);
        assert_eq!(second.item("strutCube").unwrap(), first.item("strutCube").unwrap());
    }
}
