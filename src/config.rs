//! Scan configuration assembled from command-line flags.

use std::path::PathBuf;

/// Directories never descended into.
pub const DEFAULT_IGNORED_DIRS: [&str; 7] = [
    ".venv",
    "venv",
    "env",
    "__pycache__",
    ".git",
    ".aibom",
    "node_modules",
];

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "AIBOM_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Keep prompt template text instead of `redacted`.
    pub include_prompts: bool,
    pub extra_ignored_dirs: Vec<String>,
    /// Explicit site-packages directories for framework versions.
    pub site_packages: Vec<PathBuf>,
    pub resolve_versions: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_prompts: false,
            extra_ignored_dirs: Vec::new(),
            site_packages: Vec::new(),
            resolve_versions: true,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_prompts(mut self, include: bool) -> Self {
        self.include_prompts = include;
        self
    }

    pub fn with_ignored_dir(mut self, name: impl Into<String>) -> Self {
        self.extra_ignored_dirs.push(name.into());
        self
    }

    pub fn with_site_packages(mut self, dirs: Vec<PathBuf>) -> Self {
        self.site_packages = dirs;
        self
    }

    pub fn with_version_lookup(mut self, enabled: bool) -> Self {
        self.resolve_versions = enabled;
        self
    }

    /// Default ignored directories followed by the extra ones.
    pub fn ignored_dirs(&self) -> Vec<String> {
        DEFAULT_IGNORED_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(self.extra_ignored_dirs.iter().cloned())
            .collect()
    }
}
