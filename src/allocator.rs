//! Multi-container allocation over a vessel's containers
//!
//! Containers are searched in sequence order and the first one that fits
//! wins. Callers can predict placement from the order alone, so keep it
//! first-fit.

use tracing::debug;

use crate::error::AllocationError;
use crate::inventory::{Container, StoredItem};
use crate::models::ItemDescriptor;

const SPACE_EPSILON: f64 = 1e-5;

/// Index of the first container with room for one unit of `item`
pub fn find_container_with_space(containers: &[Container], item: &ItemDescriptor) -> Option<usize> {
    containers.iter().position(|c| c.fits(item))
}

/// Whether `count` units can be spread over the containers.
///
/// Each qualifying container is credited with a single unit, whatever its
/// real headroom, so a lone container never admits more than one unit.
/// This under-reports space on purpose.
pub fn has_aggregate_space(containers: &[Container], item: &ItemDescriptor, count: u32) -> bool {
    let mut outstanding = f64::from(count);

    for container in containers {
        if outstanding <= SPACE_EPSILON {
            break;
        }
        if container.fits(item) {
            outstanding -= 1.0;
        }
    }

    debug!(item = %item.name, count, outstanding, "aggregate space check");
    outstanding <= SPACE_EPSILON
}

/// Store one unit, preferring `preferred` when it fits. Returns the index
/// of the container that received it.
pub fn place_item(
    containers: &mut [Container],
    preferred: Option<usize>,
    item: &ItemDescriptor,
    remove_resources: bool,
) -> Result<usize, AllocationError> {
    let target = match preferred {
        Some(idx) if containers.get(idx).is_some_and(|c| c.fits(item)) => Some(idx),
        _ => find_container_with_space(containers, item),
    };

    let no_space = || AllocationError::NoSpaceAvailable {
        item: item.name.clone(),
    };
    let idx = target.ok_or_else(no_space)?;
    let container = &mut containers[idx];
    let slot = container.first_empty_slot().ok_or_else(no_space)?;

    let mut stored = StoredItem::from_descriptor(item);
    if remove_resources {
        stored.drain_resources();
    }
    if !container.store(slot, stored) {
        return Err(no_space());
    }

    debug!(item = %item.name, container = %container.name, slot, "placed item");
    Ok(idx)
}

/// Remove up to `count` units across containers, in order. Returns the
/// number actually removed, which is less than `count` when stock runs out.
pub fn remove_units(containers: &mut [Container], item_name: &str, count: u32) -> u32 {
    let mut needed = count;
    for container in containers.iter_mut() {
        if needed == 0 {
            break;
        }
        let removed = container.take(item_name, needed);
        if removed > 0 {
            debug!(item = item_name, container = %container.name, removed, "removed units");
        }
        needed -= removed;
    }
    count - needed
}

pub fn count_units(containers: &[Container], item_name: &str) -> u32 {
    containers.iter().map(|c| c.count(item_name)).sum()
}

pub fn has_units(containers: &[Container], item_name: &str) -> bool {
    count_units(containers, item_name) > 0
}

/// Every stored unit as `(item name, 1)`, in container then slot order
pub fn harvest_recyclable(containers: &[Container]) -> Vec<(String, u32)> {
    containers
        .iter()
        .flat_map(Container::stacks)
        .flat_map(|stack| (0..stack.quantity).map(move |_| (stack.name.clone(), 1)))
        .collect()
}
