//! JSON output.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Pretty-printed JSON for any serializable report value.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize report")
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json_report<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = to_json(value)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
