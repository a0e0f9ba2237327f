//! CycloneDX 1.5 JSON export.

use serde_json::{json, Value};
use std::path::Path;

use super::json::write_stable_json;
use crate::core::inventory::{Inventory, InventoryEntry};
use crate::core::signatures::Category;
use crate::error::Result;

pub struct CycloneDxFormatter;

impl CycloneDxFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_to_file(&self, inventory: &Inventory, output_path: &Path) -> Result<()> {
        write_stable_json(&self.format_value(inventory), output_path)
    }

    pub fn format_value(&self, inventory: &Inventory) -> Value {
        let mut components: Vec<Value> = Vec::new();
        for category in [
            Category::Model,
            Category::Dataset,
            Category::Tool,
            Category::Framework,
        ] {
            components.extend(inventory.entries(category).iter().map(component));
        }
        components.sort_by(|a, b| {
            let key = |v: &Value| {
                (
                    v["name"].as_str().unwrap_or_default().to_string(),
                    v["bom-ref"].as_str().unwrap_or_default().to_string(),
                )
            };
            key(a).cmp(&key(b))
        });

        json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.5",
            "version": 1,
            "metadata": {
                "timestamp": inventory.metadata.generated_at,
                "tools": {
                    "components": [{
                        "type": "application",
                        "name": crate::TOOL_NAME,
                        "version": inventory.metadata.tool_version,
                    }],
                },
            },
            "components": components,
        })
    }
}

impl Default for CycloneDxFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn component(entry: &InventoryEntry) -> Value {
    let (kind, version_attr) = match entry.category() {
        Category::Model => ("machine-learning-model", Some("model")),
        Category::Dataset => ("data", None),
        Category::Tool => ("application", None),
        Category::Framework | Category::Prompt => ("library", Some("version")),
    };
    let version = version_attr
        .and_then(|attr| entry.attributes.get(attr))
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let mut component = json!({
        "type": kind,
        "bom-ref": entry.key.to_string(),
        "name": entry.symbol(),
        "version": version,
    });
    if let Some(provider) = &entry.provider {
        component["publisher"] = Value::String(provider.clone());
    }
    component
}
