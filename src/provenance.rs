//! Run provenance: timestamps, commit ids, digests and environment facts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Placeholder for facts that could not be determined.
pub const UNKNOWN_COMMIT: &str = "unknown";

/// Compact UTC timestamp used in metadata and run file names.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `git rev-parse HEAD` in `dir`, if it is inside a work tree.
pub fn git_commit(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        debug!(dir = %dir.display(), "not a git work tree");
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

pub fn git_sha(dir: &Path) -> String {
    git_commit(dir).unwrap_or_else(|| UNKNOWN_COMMIT.to_string())
}

/// Facts about the machine and tool that produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    pub tool: String,
    pub tool_version: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub os: String,
    pub arch: String,
}

impl EnvironmentFacts {
    pub fn capture(dir: &Path) -> Self {
        Self {
            tool: crate::TOOL_NAME.to_string(),
            tool_version: crate::TOOL_VERSION.to_string(),
            timestamp: utc_timestamp(),
            commit: git_commit(dir),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}
