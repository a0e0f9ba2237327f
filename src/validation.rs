//! Inventory document contract, version `1.0`.
//!
//! Validation works on raw JSON so that hand-edited or foreign documents get
//! precise errors. Every error carries a JSON pointer into the document.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::core::inventory::IdentityKey;
use crate::core::signatures::Category;
use crate::SCHEMA_VERSION;

pub const REQUIRED_KEYS: [&str; 7] = [
    "schema_version",
    "metadata",
    "models",
    "datasets",
    "tools",
    "frameworks",
    "risk_findings",
];

pub const REQUIRED_METADATA: [&str; 3] = ["generated_at", "git_sha", "artifact_sha256"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub pointer: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = if self.pointer.is_empty() { "/" } else { &self.pointer };
        write!(f, "{pointer}: {}", self.message)
    }
}

/// All problems found in one document, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pointers(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.pointer.as_str()).collect()
    }

    fn push(&mut self, pointer: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError {
            pointer: pointer.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {error}")?;
        }
        Ok(())
    }
}

/// Check `document` against the inventory contract.
pub fn validate(document: &Value) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let Some(root) = document.as_object() else {
        errors.push("", "document must be a JSON object");
        return Err(errors);
    };

    for key in REQUIRED_KEYS {
        if !root.contains_key(key) {
            errors.push(pointer(&[key]), "required key is missing");
        }
    }

    if let Some(version) = root.get("schema_version") {
        if version.as_str() != Some(SCHEMA_VERSION) {
            errors.push(
                "/schema_version",
                format!("expected \"{SCHEMA_VERSION}\", found {version}"),
            );
        }
    }

    if let Some(metadata) = root.get("metadata") {
        check_metadata(metadata, &mut errors);
    }

    for category in Category::ALL {
        if let Some(section) = root.get(category.section()) {
            check_section(category, section, &mut errors);
        }
    }

    if let Some(risks) = root.get("risk_findings") {
        check_risks(risks, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_metadata(metadata: &Value, errors: &mut ValidationErrors) {
    let Some(metadata) = metadata.as_object() else {
        errors.push("/metadata", "must be an object");
        return;
    };
    for key in REQUIRED_METADATA {
        match metadata.get(key) {
            None => errors.push(pointer(&["metadata", key]), "required key is missing"),
            Some(Value::String(_)) => {}
            Some(_) => errors.push(pointer(&["metadata", key]), "must be a string"),
        }
    }
    if let Some(Value::String(digest)) = metadata.get("artifact_sha256") {
        if !is_sha256_hex(digest) {
            errors.push(
                "/metadata/artifact_sha256",
                "must be 64 lowercase hexadecimal characters",
            );
        }
    }
}

fn check_section(category: Category, section: &Value, errors: &mut ValidationErrors) {
    let name = category.section();
    let Some(entries) = section.as_array() else {
        errors.push(pointer(&[name]), "must be an array");
        return;
    };

    let mut seen: HashSet<&str> = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let index = index.to_string();
        let Some(entry) = entry.as_object() else {
            errors.push(pointer(&[name, index.as_str()]), "entry must be an object");
            continue;
        };

        match entry.get("id") {
            Some(Value::String(id)) => {
                if !seen.insert(id) {
                    errors.push(
                        pointer(&[name, index.as_str(), "id"]),
                        format!("duplicate id '{id}'"),
                    );
                }
                match id.parse::<IdentityKey>() {
                    Ok(key) if key.category == category => {}
                    Ok(key) => errors.push(
                        pointer(&[name, index.as_str(), "id"]),
                        format!("id has category '{}', expected '{category}'", key.category),
                    ),
                    Err(message) => errors.push(pointer(&[name, index.as_str(), "id"]), message),
                }
            }
            Some(_) => errors.push(pointer(&[name, index.as_str(), "id"]), "must be a string"),
            None => errors.push(pointer(&[name, index.as_str(), "id"]), "required key is missing"),
        }

        let field = category.symbol_field();
        if !matches!(entry.get(field), Some(Value::String(_))) {
            errors.push(pointer(&[name, index.as_str(), field]), "must be a string");
        }

        check_source_files(entry, &[name, index.as_str()], errors);
    }
}

fn check_source_files(entry: &Map<String, Value>, at: &[&str], errors: &mut ValidationErrors) {
    let mut path = at.to_vec();
    path.push("source_files");
    match entry.get("source_files") {
        Some(Value::Array(files)) => {
            for (i, file) in files.iter().enumerate() {
                if !file.is_string() {
                    let i = i.to_string();
                    let mut item = path.clone();
                    item.push(i.as_str());
                    errors.push(pointer(&item), "must be a string");
                }
            }
        }
        Some(_) => errors.push(pointer(&path), "must be an array"),
        None => errors.push(pointer(&path), "required key is missing"),
    }
}

fn check_risks(risks: &Value, errors: &mut ValidationErrors) {
    let Some(risks) = risks.as_array() else {
        errors.push("/risk_findings", "must be an array");
        return;
    };
    for (index, risk) in risks.iter().enumerate() {
        let index = index.to_string();
        if !matches!(risk.get("id"), Some(Value::String(_))) {
            errors.push(pointer(&["risk_findings", index.as_str(), "id"]), "must be a string");
        }
    }
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// RFC 6901 pointer from unescaped segments.
fn pointer(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}
