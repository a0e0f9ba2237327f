//! Canonical inventory: identity keys, deduplicated entries and the
//! document written to `AI_BOM.json`.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use super::finding::{Finding, Location};
use super::signatures::Category;
use crate::error::Result;
use crate::formatters::json::to_stable_string;
use crate::provenance::sha256_hex;
use crate::risk::RiskFinding;
use crate::SCHEMA_VERSION;

/// `category:symbol[:primary]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub category: Category,
    pub symbol: String,
    pub primary: Option<String>,
}

impl IdentityKey {
    pub fn new(category: Category, symbol: impl Into<String>, primary: Option<String>) -> Self {
        Self {
            category,
            symbol: symbol.into(),
            primary,
        }
    }

    pub fn from_finding(finding: &Finding) -> Self {
        Self::new(finding.category, finding.symbol.clone(), finding.primary_value())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.symbol)?;
        if let Some(primary) = &self.primary {
            write!(f, ":{primary}")?;
        }
        Ok(())
    }
}

impl FromStr for IdentityKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let category: Category = parts.next().unwrap_or_default().parse()?;
        let symbol = match parts.next() {
            Some(symbol) if !symbol.is_empty() => symbol.to_string(),
            _ => return Err(format!("identity key '{s}' has no symbol")),
        };
        let primary = parts.next().map(str::to_string);
        Ok(Self::new(category, symbol, primary))
    }
}

impl Serialize for IdentityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdentityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Raw call details of the canonical example; never compared by the differ.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    pub call: String,
    pub qualified_name: String,
}

/// A deduplicated inventory fact.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub key: IdentityKey,
    /// Resolved attributes of the canonical example, `"unknown"` included.
    pub attributes: BTreeMap<String, Value>,
    pub provider: Option<String>,
    pub source_files: BTreeSet<String>,
    pub locations: BTreeSet<Location>,
    pub details: CallDetails,
}

const RESERVED_FIELDS: [&str; 5] = ["id", "provider", "source_files", "locations", "details"];

impl InventoryEntry {
    pub fn from_finding(finding: &Finding) -> Self {
        let mut entry = Self {
            key: IdentityKey::from_finding(finding),
            attributes: BTreeMap::new(),
            provider: None,
            source_files: BTreeSet::new(),
            locations: BTreeSet::new(),
            details: CallDetails::default(),
        };
        entry.adopt(finding);
        entry.record(finding);
        entry
    }

    pub fn category(&self) -> Category {
        self.key.category
    }

    pub fn symbol(&self) -> &str {
        &self.key.symbol
    }

    /// Attributes compared across scans: resolved arguments plus provider.
    pub fn compared_attributes(&self) -> BTreeMap<String, Value> {
        let mut compared = self.attributes.clone();
        if let Some(provider) = &self.provider {
            compared.insert("provider".to_string(), Value::String(provider.clone()));
        }
        compared
    }

    fn is_resolved(&self) -> bool {
        !self
            .attributes
            .values()
            .any(|value| contains_unknown(value))
    }

    /// Take attributes and details from `finding`.
    fn adopt(&mut self, finding: &Finding) {
        self.attributes = finding
            .arguments
            .iter()
            .filter(|(name, _)| !self.is_reserved(name))
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        self.provider = finding.provider.clone();
        self.details = CallDetails {
            call: finding.call.clone(),
            qualified_name: finding.qualified_name.clone(),
        };
    }

    fn record(&mut self, finding: &Finding) {
        self.source_files.insert(finding.location.file.clone());
        self.locations.insert(finding.location.clone());
    }

    fn is_reserved(&self, name: &str) -> bool {
        RESERVED_FIELDS.contains(&name) || name == self.key.category.symbol_field()
    }

    fn from_map(mut map: BTreeMap<String, Value>) -> std::result::Result<Self, String> {
        let id = match map.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err("entry is missing a string 'id'".to_string()),
        };
        let key: IdentityKey = id.parse()?;
        map.remove(key.category.symbol_field());

        let provider = match map.remove("provider") {
            Some(Value::String(p)) => Some(p),
            Some(Value::Null) | None => None,
            Some(other) => return Err(format!("entry '{id}' has non-string provider {other}")),
        };
        let source_files = match map.remove("source_files") {
            Some(value) => serde_json::from_value(value).map_err(|e| e.to_string())?,
            None => BTreeSet::new(),
        };
        let locations = match map.remove("locations") {
            Some(value) => serde_json::from_value(value).map_err(|e| e.to_string())?,
            None => BTreeSet::new(),
        };
        let details = match map.remove("details") {
            Some(value) => serde_json::from_value(value).map_err(|e| e.to_string())?,
            None => CallDetails::default(),
        };

        Ok(Self {
            key,
            attributes: map,
            provider,
            source_files,
            locations,
            details,
        })
    }
}

fn contains_unknown(value: &Value) -> bool {
    match value {
        Value::String(s) => s == crate::core::literal::UNKNOWN,
        Value::Array(items) => items.iter().any(contains_unknown),
        Value::Object(items) => items.values().any(contains_unknown),
        _ => false,
    }
}

impl Serialize for InventoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.key)?;
        map.serialize_entry(self.key.category.symbol_field(), &self.key.symbol)?;
        for (name, value) in &self.attributes {
            if !self.is_reserved(name) {
                map.serialize_entry(name, value)?;
            }
        }
        if let Some(provider) = &self.provider {
            map.serialize_entry("provider", provider)?;
        }
        map.serialize_entry("source_files", &self.source_files)?;
        map.serialize_entry("locations", &self.locations)?;
        map.serialize_entry("details", &self.details)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for InventoryEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Self::from_map(map).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMetadata {
    pub generated_at: String,
    pub git_sha: String,
    #[serde(default)]
    pub tool_version: String,
    #[serde(default)]
    pub artifact_sha256: String,
}

impl InventoryMetadata {
    pub fn new(generated_at: impl Into<String>, git_sha: impl Into<String>) -> Self {
        Self {
            generated_at: generated_at.into(),
            git_sha: git_sha.into(),
            tool_version: crate::TOOL_VERSION.to_string(),
            artifact_sha256: String::new(),
        }
    }
}

/// The inventory document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub schema_version: String,
    pub metadata: InventoryMetadata,
    pub models: Vec<InventoryEntry>,
    pub datasets: Vec<InventoryEntry>,
    pub tools: Vec<InventoryEntry>,
    pub frameworks: Vec<InventoryEntry>,
    #[serde(default)]
    pub prompts: Vec<InventoryEntry>,
    pub risk_findings: Vec<RiskFinding>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub analysis_warnings: BTreeMap<String, String>,
}

impl Inventory {
    pub fn empty(metadata: InventoryMetadata) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            metadata,
            models: Vec::new(),
            datasets: Vec::new(),
            tools: Vec::new(),
            frameworks: Vec::new(),
            prompts: Vec::new(),
            risk_findings: Vec::new(),
            analysis_warnings: BTreeMap::new(),
        }
    }

    pub fn entries(&self, category: Category) -> &[InventoryEntry] {
        match category {
            Category::Model => &self.models,
            Category::Dataset => &self.datasets,
            Category::Tool => &self.tools,
            Category::Framework => &self.frameworks,
            Category::Prompt => &self.prompts,
        }
    }

    fn entries_mut(&mut self, category: Category) -> &mut Vec<InventoryEntry> {
        match category {
            Category::Model => &mut self.models,
            Category::Dataset => &mut self.datasets,
            Category::Tool => &mut self.tools,
            Category::Framework => &mut self.frameworks,
            Category::Prompt => &mut self.prompts,
        }
    }

    /// Every entry, in category order.
    pub fn all_entries(&self) -> impl Iterator<Item = &InventoryEntry> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.entries(category).iter())
    }

    pub fn find(&self, key: &IdentityKey) -> Option<&InventoryEntry> {
        self.entries(key.category).iter().find(|e| &e.key == key)
    }

    /// Providers referenced anywhere in the inventory.
    pub fn providers(&self) -> BTreeSet<&str> {
        self.all_entries()
            .filter_map(|entry| entry.provider.as_deref())
            .collect()
    }

    /// SHA-256 of the stable JSON rendering with `artifact_sha256` blanked.
    pub fn content_digest(&self) -> Result<String> {
        let mut unsealed = self.clone();
        unsealed.metadata.artifact_sha256 = String::new();
        let rendered = to_stable_string(&unsealed)?;
        Ok(sha256_hex(rendered.as_bytes()))
    }

    /// Fill `metadata.artifact_sha256`.
    pub fn seal(&mut self) -> Result<()> {
        self.metadata.artifact_sha256 = self.content_digest()?;
        Ok(())
    }

    pub fn is_sealed(&self) -> Result<bool> {
        Ok(!self.metadata.artifact_sha256.is_empty()
            && self.content_digest()? == self.metadata.artifact_sha256)
    }
}

struct Slot {
    entry: InventoryEntry,
    resolved: bool,
}

/// Merges findings into an [`Inventory`].
///
/// Entries keep first-seen order within their category. An entry whose
/// attributes contain `unknown` is upgraded by the first later finding that
/// resolves fully; otherwise the first example stays canonical.
#[derive(Default)]
pub struct InventoryBuilder {
    slots: BTreeMap<Category, Vec<Slot>>,
    index: HashMap<IdentityKey, usize>,
    warnings: BTreeMap<String, String>,
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, finding: Finding) {
        let key = IdentityKey::from_finding(&finding);
        let slots = self.slots.entry(key.category).or_default();

        if let Some(&position) = self.index.get(&key) {
            let slot = &mut slots[position];
            slot.entry.record(&finding);
            if !slot.resolved && finding.is_fully_resolved() {
                slot.entry.adopt(&finding);
                slot.resolved = true;
            }
            return;
        }

        let entry = InventoryEntry::from_finding(&finding);
        let resolved = entry.is_resolved();
        self.index.insert(key, slots.len());
        slots.push(Slot { entry, resolved });
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        for finding in findings {
            self.add(finding);
        }
    }

    /// Record a file that could not be analyzed.
    pub fn warn(&mut self, file: impl Into<String>, message: impl Into<String>) {
        self.warnings.insert(file.into(), message.into());
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn build(self, metadata: InventoryMetadata) -> Inventory {
        let mut inventory = Inventory::empty(metadata);
        for (category, slots) in self.slots {
            *inventory.entries_mut(category) = slots.into_iter().map(|slot| slot.entry).collect();
        }
        inventory.analysis_warnings = self.warnings;
        inventory
    }
}
