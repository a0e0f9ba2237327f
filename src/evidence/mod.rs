//! Evidence bundles: a zip of generated artifacts with a SHA-256 manifest.
//!
//! Entries are written in name order with a fixed modification time, so the
//! same inputs give the same archive bytes apart from the timestamp fact in
//! `ENVIRONMENT.json` and the manifest.

pub mod manifest;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::core::inventory::Inventory;
use crate::drift::diff;
use crate::error::{AibomError, Result};
use crate::formatters::json::to_stable_string;
use crate::formatters::SpdxFormatter;
use crate::provenance::EnvironmentFacts;
use crate::storage::{load_inventory, load_json};
use crate::validation::validate;

pub use manifest::{verify_bundle, EvidenceManifest, VerificationReport, MANIFEST_NAME};

pub const ENVIRONMENT_NAME: &str = "ENVIRONMENT.json";
pub const DIFF_NAME: &str = "DIFF.json";
pub const COMPLIANCE_NAME: &str = "COMPLIANCE_MAPPING.md";

const RESERVED_NAMES: [&str; 4] = [MANIFEST_NAME, ENVIRONMENT_NAME, DIFF_NAME, COMPLIANCE_NAME];

const COMPLIANCE_MAPPING: &str = "\
# Starter Compliance Mapping

This mapping is a starter reference only and not legal advice.

| Bundle entry | Supports |
|---|---|
| AIBOM.json | Inventory of AI components (EU AI Act Art. 11 technical documentation, NIST AI RMF MAP 4.1) |
| SPDX.json | Software bill of materials exchange (SPDX 2.3) |
| DIFF.json | Change tracking between scans (NIST AI RMF MANAGE 4.1) |
| ENVIRONMENT.json | Provenance of the scan |
| MANIFEST.json | Integrity digests for every entry |
";

/// Where an artifact's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub source: ArtifactSource,
}

impl Artifact {
    pub fn bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: ArtifactSource::Bytes(bytes.into()),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: ArtifactSource::File(path.into()),
        }
    }

    /// File artifact named after the file itself.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AibomError::ArtifactName(path.display().to_string()))?;
        Ok(Self::file(name, path))
    }

    fn read(&self) -> Result<Vec<u8>> {
        match &self.source {
            ArtifactSource::Bytes(bytes) => Ok(bytes.clone()),
            ArtifactSource::File(path) => fs::read(path).map_err(|source| AibomError::Artifact {
                name: self.name.clone(),
                source,
            }),
        }
    }
}

/// Everything that goes into one bundle.
pub struct BundleRequest<'a> {
    pub artifacts: Vec<Artifact>,
    pub environment: EnvironmentFacts,
    pub baseline: Option<&'a Inventory>,
    pub current: Option<&'a Inventory>,
}

/// Relative, non-empty, no `..`, not reserved.
pub fn check_artifact_name(name: &str) -> Result<()> {
    let invalid = || AibomError::ArtifactName(name.to_string());
    if name.is_empty() || name.contains('\\') || RESERVED_NAMES.contains(&name) {
        return Err(invalid());
    }
    let path = Path::new(name);
    let all_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal || name.ends_with('/') {
        return Err(invalid());
    }
    Ok(())
}

/// Write a bundle to `out` and return its manifest.
///
/// Every artifact is read before `out` is touched; a failure leaves no
/// archive behind.
pub fn create_bundle(request: &BundleRequest<'_>, out: &Path) -> Result<EvidenceManifest> {
    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for artifact in &request.artifacts {
        check_artifact_name(&artifact.name)?;
        if files.contains_key(&artifact.name) {
            return Err(AibomError::ArtifactName(artifact.name.clone()));
        }
        files.insert(artifact.name.clone(), artifact.read()?);
    }

    files.insert(
        ENVIRONMENT_NAME.to_string(),
        to_stable_string(&request.environment)?.into_bytes(),
    );
    if let (Some(baseline), Some(current)) = (request.baseline, request.current) {
        let report = diff(baseline, current);
        files.insert(DIFF_NAME.to_string(), to_stable_string(&report)?.into_bytes());
    }
    files.insert(
        COMPLIANCE_NAME.to_string(),
        COMPLIANCE_MAPPING.as_bytes().to_vec(),
    );

    let manifest = EvidenceManifest::new(&files, request.environment.clone());
    files.insert(
        MANIFEST_NAME.to_string(),
        to_stable_string(&manifest)?.into_bytes(),
    );

    write_archive(&files, out)?;
    info!(bundle = %out.display(), entries = files.len(), "wrote evidence bundle");
    Ok(manifest)
}

fn write_archive(files: &BTreeMap<String, Vec<u8>>, out: &Path) -> Result<()> {
    let parent = match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| AibomError::io(&parent, e))?;
    let temp = NamedTempFile::new_in(&parent).map_err(|e| AibomError::io(&parent, e))?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(temp);
    for (name, bytes) in files {
        writer.start_file(name.as_str(), options)?;
        writer
            .write_all(bytes)
            .map_err(|e| AibomError::io(out, e))?;
    }
    let temp = writer.finish()?;
    temp.persist(out).map_err(|e| AibomError::io(out, e.error))?;
    Ok(())
}

/// Bundle an inventory file the way the CLI does: `AIBOM.json`, `SPDX.json`,
/// extra artifacts and, when a usable baseline is given, `DIFF.json`.
pub fn bundle_inventory(
    input: &Path,
    out: &Path,
    baseline: Option<&Path>,
    extra: &[PathBuf],
    environment: EnvironmentFacts,
) -> Result<EvidenceManifest> {
    let document = load_json(input)?;
    validate(&document).map_err(AibomError::Validation)?;
    let current: Inventory = serde_json::from_value(document.clone()).map_err(|source| {
        AibomError::Json {
            path: input.to_path_buf(),
            source,
        }
    })?;

    let baseline = baseline.and_then(|path| match load_inventory(path) {
        Ok(inventory) => Some(inventory),
        Err(err) => {
            warn!(baseline = %path.display(), error = %err, "skipping unusable baseline");
            None
        }
    });

    let spdx = SpdxFormatter::new().format_value(&current);
    let mut artifacts = vec![
        Artifact::bytes("AIBOM.json", to_stable_string(&document)?),
        Artifact::bytes("SPDX.json", to_stable_string(&spdx)?),
    ];
    for path in extra {
        artifacts.push(Artifact::from_path(path)?);
    }

    let request = BundleRequest {
        artifacts,
        environment,
        baseline: baseline.as_ref(),
        current: Some(&current),
    };
    create_bundle(&request, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_must_be_plain_relative_paths() {
        assert!(check_artifact_name("AIBOM.json").is_ok());
        assert!(check_artifact_name("reports/scan.txt").is_ok());
        for bad in [
            "",
            "/etc/passwd",
            "../escape",
            "a/../b",
            "./a",
            "dir/",
            "MANIFEST.json",
            "DIFF.json",
            "a\\b",
        ] {
            assert!(check_artifact_name(bad).is_err(), "{bad:?} accepted");
        }
    }
}
