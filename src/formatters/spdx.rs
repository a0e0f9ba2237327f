//! SPDX 2.3 JSON export.

use chrono::NaiveDateTime;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::Path;

use super::json::write_stable_json;
use crate::core::inventory::{Inventory, InventoryEntry};
use crate::core::signatures::Category;
use crate::error::Result;

pub struct SpdxFormatter {
    namespace_base: String,
}

impl SpdxFormatter {
    pub fn new() -> Self {
        Self {
            namespace_base: "https://spdx.org/spdxdocs/aibom".to_string(),
        }
    }

    pub fn with_namespace_base(mut self, base: impl Into<String>) -> Self {
        self.namespace_base = base.into();
        self
    }

    pub fn format_to_file(&self, inventory: &Inventory, output_path: &Path) -> Result<()> {
        write_stable_json(&self.format_value(inventory), output_path)
    }

    pub fn format_value(&self, inventory: &Inventory) -> Value {
        let mut ids = BTreeSet::new();
        let mut packages: Vec<Value> = Vec::new();

        for category in [
            Category::Model,
            Category::Dataset,
            Category::Tool,
            Category::Framework,
        ] {
            for entry in inventory.entries(category) {
                let spdx_id = unique_id(&mut ids, entry);
                packages.push(package(entry, spdx_id));
            }
        }
        packages.sort_by(|a, b| a["SPDXID"].as_str().cmp(&b["SPDXID"].as_str()));

        let digest = if inventory.metadata.artifact_sha256.is_empty() {
            "unsealed"
        } else {
            inventory.metadata.artifact_sha256.as_str()
        };

        json!({
            "spdxVersion": "SPDX-2.3",
            "dataLicense": "CC0-1.0",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "AIBOM Export",
            "documentNamespace": format!("{}/{}", self.namespace_base, digest),
            "creationInfo": {
                "created": iso_timestamp(&inventory.metadata.generated_at),
                "creators": [format!("Tool: {}-{}", crate::TOOL_NAME, inventory.metadata.tool_version)],
            },
            "packages": packages,
        })
    }
}

impl Default for SpdxFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn package(entry: &InventoryEntry, spdx_id: String) -> Value {
    let version = match entry.category() {
        Category::Model => entry.attributes.get("model"),
        Category::Framework => entry.attributes.get("version"),
        _ => None,
    }
    .and_then(Value::as_str)
    .unwrap_or("unknown");

    let mut package = json!({
        "SPDXID": spdx_id,
        "name": entry.symbol(),
        "versionInfo": version,
        "downloadLocation": "NOASSERTION",
        "filesAnalyzed": false,
        "comment": format!("aibom identity {}", entry.key),
    });
    if let Some(provider) = &entry.provider {
        package["supplier"] = Value::String(format!("Organization: {provider}"));
    }
    package
}

/// `SPDXRef-<Category>-<symbol>[-<primary>]`, restricted to the SPDX id
/// alphabet and made unique with a numeric suffix.
fn unique_id(taken: &mut BTreeSet<String>, entry: &InventoryEntry) -> String {
    let mut raw = format!("{}-{}", capitalized(entry.category().as_str()), entry.symbol());
    if let Some(primary) = &entry.key.primary {
        raw.push('-');
        raw.push_str(primary);
    }
    let base = format!("SPDXRef-{}", sanitize(&raw));

    let mut candidate = base.clone();
    let mut counter = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn iso_timestamp(compact: &str) -> String {
    NaiveDateTime::parse_from_str(compact, "%Y%m%dT%H%M%SZ")
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|_| compact.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sanitized() {
        assert_eq!(sanitize("Dataset-FAISS.from_documents-./idx"), "Dataset-FAISS-from-documents---idx");
        assert_eq!(capitalized("model"), "Model");
    }

    #[test]
    fn compact_timestamps_become_iso() {
        assert_eq!(iso_timestamp("20250102T030405Z"), "2025-01-02T03:04:05Z");
        assert_eq!(iso_timestamp("garbage"), "garbage");
    }
}
