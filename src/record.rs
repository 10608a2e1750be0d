//! Persisted record format for build items
//!
//! Saving is strict; restoring is permissive. Missing or unparseable
//! fields keep their defaults and broken sub-records are dropped, so a
//! record written by an older or newer save format still loads.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::ledger::BuildItem;
use crate::models::{RequiredComponent, ResourceRequirement};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildItemRecord<'a> {
    part_name: &'a str,
    total_units_required: f64,
    total_units_printed: f64,
    remove_resources: bool,
    variant_index: i32,
    is_being_recycled: bool,
    minimum_gravity: f64,
    minimum_pressure: f64,
    materials: &'a [ResourceRequirement],
    components: &'a [RequiredComponent],
}

pub fn save(item: &BuildItem) -> serde_json::Result<Value> {
    let record = BuildItemRecord {
        part_name: &item.item_name,
        total_units_required: item.total_units_required,
        total_units_printed: item.total_units_printed,
        remove_resources: item.remove_resources,
        variant_index: item.variant_index,
        is_being_recycled: item.is_being_recycled,
        minimum_gravity: item.minimum_gravity,
        minimum_pressure: item.minimum_pressure,
        materials: &item.materials,
        components: &item.required_components,
    };
    serde_json::to_value(record)
}

pub fn save_string(item: &BuildItem) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&save(item)?)
}

/// Restore a build item. Never fails; a non-object yields the default item.
pub fn restore(record: &Value) -> BuildItem {
    let mut item = BuildItem::default();
    let Some(fields) = record.as_object() else {
        warn!("build item record is not an object, using defaults");
        return item;
    };

    if let Some(name) = fields.get("partName").and_then(Value::as_str) {
        item.item_name = name.to_string();
    }
    read(fields, "totalUnitsRequired", number, &mut item.total_units_required);
    read(fields, "totalUnitsPrinted", number, &mut item.total_units_printed);
    read(fields, "removeResources", boolean, &mut item.remove_resources);
    read(fields, "variantIndex", integer, &mut item.variant_index);
    read(fields, "isBeingRecycled", boolean, &mut item.is_being_recycled);
    read(fields, "minimumGravity", number, &mut item.minimum_gravity);
    read(fields, "minimumPressure", number, &mut item.minimum_pressure);

    item.materials = entries(fields, "materials")
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let mut material = ResourceRequirement::new(name, 0.0);
            read(entry, "rate", number, &mut material.rate);
            read(entry, "amount", number, &mut material.amount);
            Some(material)
        })
        .collect();

    item.required_components = entries(fields, "components")
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let mut component = RequiredComponent {
                name: name.to_string(),
                amount: 0.0,
            };
            read(entry, "amount", number, &mut component.amount);
            Some(component)
        })
        .collect();

    item
}

pub fn restore_str(text: &str) -> BuildItem {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => restore(&value),
        Err(e) => {
            warn!(error = %e, "unreadable build item record, using defaults");
            BuildItem::default()
        }
    }
}

/// Overwrite `slot` only when the field is present and parses
fn read<T>(fields: &Map<String, Value>, key: &str, parse: fn(&Value) -> Option<T>, slot: &mut T) {
    let Some(raw) = fields.get(key) else {
        return;
    };
    match parse(raw) {
        Some(value) => *slot = value,
        None => warn!(field = key, value = %raw, "ignoring unparseable field"),
    }
}

fn entries<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn number(value: &Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
