//! Bundle manifest and verification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::error::{AibomError, Result};
use crate::provenance::{sha256_hex, EnvironmentFacts};

pub const MANIFEST_NAME: &str = "MANIFEST.json";
pub const HASH_ALGORITHM: &str = "sha256";

/// Digest of every other bundle entry, plus the environment that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    pub algorithm: String,
    pub files: BTreeMap<String, String>,
    pub environment: EnvironmentFacts,
}

impl EvidenceManifest {
    pub fn new(files: &BTreeMap<String, Vec<u8>>, environment: EnvironmentFacts) -> Self {
        Self {
            algorithm: HASH_ALGORITHM.to_string(),
            files: files
                .iter()
                .map(|(name, bytes)| (name.clone(), sha256_hex(bytes)))
                .collect(),
            environment,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub verified: Vec<String>,
    /// Entries whose bytes do not hash to the manifest digest.
    pub mismatched: Vec<String>,
    /// Listed in the manifest but absent from the archive.
    pub missing: Vec<String>,
    /// Present in the archive but not listed.
    pub unlisted: Vec<String>,
}

impl VerificationReport {
    pub fn is_intact(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.unlisted.is_empty()
    }
}

/// Recompute every digest listed in a bundle's manifest.
pub fn verify_bundle(path: &Path) -> Result<VerificationReport> {
    let file = File::open(path).map_err(|e| AibomError::io(path, e))?;
    let mut archive = ZipArchive::new(file)?;

    let manifest: EvidenceManifest = {
        let mut entry = archive.by_name(MANIFEST_NAME)?;
        let mut raw = Vec::new();
        entry
            .read_to_end(&mut raw)
            .map_err(|e| AibomError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|e| {
            AibomError::Format(format!("{MANIFEST_NAME} in {}: {e}", path.display()))
        })?
    };
    if manifest.algorithm != HASH_ALGORITHM {
        return Err(AibomError::Format(format!(
            "unsupported manifest algorithm '{}'",
            manifest.algorithm
        )));
    }

    let mut actual: BTreeMap<String, String> = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if name == MANIFEST_NAME {
            continue;
        }
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| AibomError::io(path, e))?;
        actual.insert(name, sha256_hex(&bytes));
    }

    let mut report = VerificationReport::default();
    for (name, expected) in &manifest.files {
        match actual.get(name) {
            Some(digest) if digest == expected => report.verified.push(name.clone()),
            Some(_) => report.mismatched.push(name.clone()),
            None => report.missing.push(name.clone()),
        }
    }
    report.unlisted = actual
        .keys()
        .filter(|name| !manifest.files.contains_key(*name))
        .cloned()
        .collect();
    Ok(report)
}
