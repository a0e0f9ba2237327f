//! Inventory drift: structured deltas between two scans and gate checks.

pub mod differ;
pub mod gate;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::inventory::IdentityKey;
use crate::core::signatures::Category;
use crate::error::AibomError;

pub use differ::diff;
pub use gate::Gate;

/// Classification of a single change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DriftKind {
    New(Category),
    Removed(Category),
    NewExternalProvider,
    /// A compared attribute changed value; carries the attribute name.
    Changed(String),
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftKind::New(category) => write!(f, "new-{category}"),
            DriftKind::Removed(category) => write!(f, "removed-{category}"),
            DriftKind::NewExternalProvider => f.write_str("new-external-provider"),
            DriftKind::Changed(attribute) => write!(f, "changed-{attribute}"),
        }
    }
}

impl FromStr for DriftKind {
    type Err = AibomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || AibomError::UnknownDriftKind(s.to_string());
        if s == "new-external-provider" {
            return Ok(DriftKind::NewExternalProvider);
        }
        if let Some(category) = s.strip_prefix("new-") {
            return category.parse().map(DriftKind::New).map_err(|_| unknown());
        }
        if let Some(category) = s.strip_prefix("removed-") {
            return category.parse().map(DriftKind::Removed).map_err(|_| unknown());
        }
        match s.strip_prefix("changed-") {
            Some(attribute) if !attribute.is_empty() => Ok(DriftKind::Changed(attribute.to_string())),
            _ => Err(unknown()),
        }
    }
}

impl Serialize for DriftKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DriftKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub kind: DriftKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<IdentityKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    GateFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub records: Vec<DriftRecord>,
    /// Record count per kind.
    pub summary: BTreeMap<String, usize>,
    pub gate_failed: bool,
    /// Gated kinds that fired, sorted by name.
    pub blocking: Vec<DriftKind>,
}

impl DriftReport {
    pub fn new(records: Vec<DriftRecord>) -> Self {
        let mut summary = BTreeMap::new();
        for record in &records {
            *summary.entry(record.kind.to_string()).or_insert(0) += 1;
        }
        Self {
            records,
            summary,
            gate_failed: false,
            blocking: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: &DriftKind) -> usize {
        self.summary.get(&kind.to_string()).copied().unwrap_or(0)
    }

    pub fn outcome(&self) -> Outcome {
        if self.gate_failed {
            Outcome::GateFailed
        } else {
            Outcome::Success
        }
    }
}
