//! Stable JSON: keys sorted, two-space indentation, trailing newline.

use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::storage::write_atomic;

/// Render any serializable value with sorted object keys.
///
/// Going through [`serde_json::Value`] sorts keys, since its map is
/// ordered by key.
pub fn to_stable_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    let mut rendered = serde_json::to_string_pretty(&value)?;
    rendered.push('\n');
    Ok(rendered)
}

pub fn write_stable_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let rendered = to_stable_string(value)?;
    write_atomic(path, rendered.as_bytes())
}
