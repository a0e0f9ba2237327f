//! File I/O for inventories: atomic writes, loading and run history.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::inventory::Inventory;
use crate::error::{AibomError, Result};
use crate::formatters::json::{to_stable_string, write_stable_json};
use crate::validation::validate;

/// Directory under the scan target holding run history.
pub const STATE_DIR: &str = ".aibom";

/// Write `bytes` to a temp file beside `path`, then rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| AibomError::io(&parent, e))?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| AibomError::io(&parent, e))?;
    temp.write_all(bytes).map_err(|e| AibomError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| AibomError::io(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| AibomError::io(path, e.error))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| AibomError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| AibomError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate an inventory document.
pub fn load_inventory(path: &Path) -> Result<Inventory> {
    let document = load_json(path)?;
    validate(&document).map_err(AibomError::Validation)?;
    serde_json::from_value(document).map_err(|source| AibomError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate, then write. An invalid inventory never reaches `path`.
pub fn write_inventory(inventory: &Inventory, path: &Path) -> Result<()> {
    let document = serde_json::to_value(inventory)?;
    validate(&document).map_err(AibomError::Validation)?;
    write_stable_json(&document, path)
}

/// Record a run as `.aibom/runs/<timestamp>_<sha12>.json` and refresh
/// `.aibom/latest.json`. Returns the run file path.
pub fn persist_run(target: &Path, inventory: &Inventory) -> Result<PathBuf> {
    let state = target.join(STATE_DIR);
    let short_sha: String = inventory.metadata.git_sha.chars().take(12).collect();
    let run_path = state.join("runs").join(format!(
        "{}_{}.json",
        inventory.metadata.generated_at, short_sha
    ));

    let rendered = to_stable_string(inventory)?;
    write_atomic(&run_path, rendered.as_bytes())?;
    write_atomic(&state.join("latest.json"), rendered.as_bytes())?;
    info!(run = %run_path.display(), "persisted run");
    Ok(run_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn load_json_reports_path_on_syntax_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_json(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
