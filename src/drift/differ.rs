use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::{DriftKind, DriftRecord, DriftReport};
use crate::core::inventory::{Inventory, InventoryEntry};
use crate::core::signatures::Category;

/// Compare `baseline` with `current`.
///
/// Records come per category in category order, by identity key, followed
/// by `new-external-provider` records ordered by provider. Neither side is
/// modified and the gate is left unevaluated.
pub fn diff(baseline: &Inventory, current: &Inventory) -> DriftReport {
    let mut records = Vec::new();
    let mut introduced: Vec<&InventoryEntry> = Vec::new();

    for category in Category::ALL {
        let before = keyed(baseline.entries(category));
        let after = keyed(current.entries(category));
        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

        for key in keys {
            match (before.get(key).copied(), after.get(key).copied()) {
                (None, Some(entry)) => {
                    records.push(entry_record(DriftKind::New(category), entry, false));
                    introduced.push(entry);
                }
                (Some(entry), None) => {
                    records.push(entry_record(DriftKind::Removed(category), entry, true));
                }
                (Some(old), Some(new)) => records.extend(attribute_changes(old, new)),
                (None, None) => {}
            }
        }
    }

    records.extend(new_providers(baseline, &introduced));
    DriftReport::new(records)
}

fn keyed(entries: &[InventoryEntry]) -> BTreeMap<String, &InventoryEntry> {
    entries
        .iter()
        .map(|entry| (entry.key.to_string(), entry))
        .collect()
}

fn snapshot(entry: &InventoryEntry) -> Option<Value> {
    serde_json::to_value(entry).ok()
}

fn entry_record(kind: DriftKind, entry: &InventoryEntry, removed: bool) -> DriftRecord {
    let (before, after) = if removed {
        (snapshot(entry), None)
    } else {
        (None, snapshot(entry))
    };
    DriftRecord {
        kind,
        category: Some(entry.category()),
        key: Some(entry.key.clone()),
        provider: entry.provider.clone(),
        before,
        after,
    }
}

/// One `changed-<attribute>` record per differing attribute name.
fn attribute_changes(old: &InventoryEntry, new: &InventoryEntry) -> Vec<DriftRecord> {
    let before = old.compared_attributes();
    let after = new.compared_attributes();
    let names: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    names
        .into_iter()
        .filter(|name| before.get(*name) != after.get(*name))
        .map(|name| DriftRecord {
            kind: DriftKind::Changed(name.clone()),
            category: Some(new.category()),
            key: Some(new.key.clone()),
            provider: new.provider.clone(),
            before: before.get(name).cloned(),
            after: after.get(name).cloned(),
        })
        .collect()
}

/// Providers of newly added entries that the baseline never referenced.
fn new_providers(baseline: &Inventory, introduced: &[&InventoryEntry]) -> Vec<DriftRecord> {
    let known = baseline.providers();
    let mut first_seen: BTreeMap<&str, &InventoryEntry> = BTreeMap::new();
    for &entry in introduced {
        if let Some(provider) = entry.provider.as_deref() {
            if !known.contains(provider) {
                first_seen.entry(provider).or_insert(entry);
            }
        }
    }

    first_seen
        .into_iter()
        .map(|(provider, entry)| DriftRecord {
            kind: DriftKind::NewExternalProvider,
            category: Some(entry.category()),
            key: Some(entry.key.clone()),
            provider: Some(provider.to_string()),
            before: None,
            after: None,
        })
        .collect()
}
