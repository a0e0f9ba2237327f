use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

use super::finding::Finding;
use super::inventory::{Inventory, InventoryBuilder, InventoryMetadata};
use super::matcher::PatternMatcher;
use super::scanner::{FileInfo, FileScanner};
use super::signatures::SignatureRegistry;
use super::versions::SitePackages;
use crate::config::ScanConfig;
use crate::error::{AibomError, Result};
use crate::parsers::PythonParser;
use crate::provenance::{git_sha, utc_timestamp};
use crate::risk;

/// Drives scanner, parser, matcher and builder over one source tree.
pub struct CodebaseAnalyzer {
    file_scanner: FileScanner,
    registry: SignatureRegistry,
    config: ScanConfig,
}

impl CodebaseAnalyzer {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            file_scanner: FileScanner::with_ignored(config.ignored_dirs()),
            registry: SignatureRegistry::builtin(),
            config,
        }
    }

    pub fn with_registry(mut self, registry: SignatureRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    pub fn analyze(&self, root_path: &Path) -> Result<Inventory> {
        let metadata = InventoryMetadata::new(utc_timestamp(), git_sha(root_path));
        self.analyze_with_metadata(root_path, metadata)
    }

    /// Scan with caller-supplied metadata; the digest is filled in here.
    pub fn analyze_with_metadata(
        &self,
        root_path: &Path,
        metadata: InventoryMetadata,
    ) -> Result<Inventory> {
        info!(root = %root_path.display(), "scanning files");
        let files = self.file_scanner.scan_directory(root_path)?;
        info!(count = files.len(), "found python files");

        let site_packages = self
            .config
            .resolve_versions
            .then(|| SitePackages::discover(root_path, &self.config.site_packages));
        let mut matcher =
            PatternMatcher::new(&self.registry).include_prompts(self.config.include_prompts);
        if let Some(lookup) = &site_packages {
            matcher = matcher.with_versions(lookup);
        }

        // Grammar/runtime ABI mismatch is fatal, not a per-file warning.
        PythonParser::new()?;

        // One parser per worker; merge in file order.
        let outcomes: Vec<(&FileInfo, Result<Vec<Finding>>)> = files
            .par_iter()
            .map_init(PythonParser::new, |parser, file| {
                (file, match_file(parser, &matcher, file))
            })
            .collect();

        let mut builder = InventoryBuilder::new();
        for (file, outcome) in outcomes {
            match outcome {
                Ok(findings) => {
                    debug!(file = %file.relative, findings = findings.len(), "matched");
                    builder.extend(findings);
                }
                Err(err) => {
                    warn!(file = %file.relative, error = %err, "skipping file");
                    builder.warn(file.relative.clone(), err.to_string());
                }
            }
        }
        info!(entries = builder.len(), "built inventory");

        let mut inventory = builder.build(metadata);
        inventory.risk_findings = risk::assess(&inventory);
        inventory.seal()?;
        Ok(inventory)
    }
}

fn match_file(
    parser: &mut Result<PythonParser>,
    matcher: &PatternMatcher<'_>,
    file: &FileInfo,
) -> Result<Vec<Finding>> {
    let parser = parser.as_mut().map_err(|err| AibomError::Parse {
        path: file.path.clone(),
        message: err.to_string(),
    })?;
    let parsed = parser.parse_file(&file.path)?;
    Ok(matcher.matches(&parsed, &file.relative).collect())
}

impl Default for CodebaseAnalyzer {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}
