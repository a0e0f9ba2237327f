//! Installed-version lookup for frameworks.
//!
//! Reads distribution metadata directory names from Python site-packages
//! directories; nothing is imported or executed.

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::signatures::FrameworkSignature;

pub trait VersionLookup: Send + Sync {
    /// Installed version of a framework, or `None` when unavailable.
    fn installed_version(&self, framework: &FrameworkSignature) -> Option<String>;
}

/// Version lookup over `*.dist-info` / `*.egg-info` directories.
pub struct SitePackages {
    dirs: Vec<PathBuf>,
    memo: DashMap<String, Option<String>>,
}

impl SitePackages {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            memo: DashMap::new(),
        }
    }

    /// Explicit directories win; otherwise `$VIRTUAL_ENV` and the target's
    /// own `.venv` / `venv` are searched.
    pub fn discover(target: &Path, explicit: &[PathBuf]) -> Self {
        if !explicit.is_empty() {
            return Self::new(explicit.to_vec());
        }

        let mut envs: Vec<PathBuf> = Vec::new();
        if let Some(venv) = std::env::var_os("VIRTUAL_ENV") {
            envs.push(PathBuf::from(venv));
        }
        envs.push(target.join(".venv"));
        envs.push(target.join("venv"));

        let dirs: Vec<PathBuf> = envs.iter().flat_map(|env| site_dirs(env)).collect();
        debug!(count = dirs.len(), "discovered site-packages directories");
        Self::new(dirs)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn find_distribution(&self, distribution: &str) -> Option<String> {
        let wanted = normalize(distribution);
        for dir in &self.dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let mut names: Vec<String> = entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .collect();
            names.sort();
            for name in names {
                if let Some((dist, version)) = parse_metadata_dir(&name) {
                    if normalize(&dist) == wanted {
                        return Some(version);
                    }
                }
            }
        }
        None
    }
}

impl VersionLookup for SitePackages {
    fn installed_version(&self, framework: &FrameworkSignature) -> Option<String> {
        if let Some(hit) = self.memo.get(&framework.name) {
            return hit.clone();
        }
        let version = framework
            .distributions
            .iter()
            .find_map(|dist| self.find_distribution(dist));
        self.memo.insert(framework.name.clone(), version.clone());
        version
    }
}

fn site_dirs(env: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let windows = env.join("Lib").join("site-packages");
    if windows.is_dir() {
        dirs.push(windows);
    }
    if let Ok(entries) = fs::read_dir(env.join("lib")) {
        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("python"))
            .map(|e| e.path().join("site-packages"))
            .filter(|p| p.is_dir())
            .collect();
        found.sort();
        dirs.extend(found);
    }
    dirs
}

/// Split `name-version.dist-info` or `name-version-pyX.Y.egg-info`.
fn parse_metadata_dir(name: &str) -> Option<(String, String)> {
    let stem = name
        .strip_suffix(".dist-info")
        .or_else(|| name.strip_suffix(".egg-info"))?;
    let mut parts = stem.split('-');
    let dist = parts.next()?;
    let version = parts.next()?;
    if dist.is_empty() || version.is_empty() {
        return None;
    }
    Some((dist.to_string(), version.to_string()))
}

/// PEP 503 name normalization, with `_` as the separator.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_sep {
                out.push('_');
            }
            last_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_sep = false;
        }
    }
    out
}
