//! Helpers for constructing Stackfile fixtures in tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix `body` with the standard version and project header.
#[must_use]
pub fn manifest_yaml(body: &str) -> String {
    format!("stack_version: \"1.0.0\"\nproject: demo\n{body}")
}

/// A resource group followed by a managed identity, the smallest useful stack.
#[must_use]
pub fn minimal_stack() -> String {
    manifest_yaml(concat!(
        "resources:\n",
        "  - kind: resource_group\n",
        "    id: rg\n",
        "    name: demo-rg\n",
        "    location: brazilsouth\n",
        "  - kind: managed_identity\n",
        "    id: identity\n",
        "    name: demo-id\n",
        "    resource_group: rg\n",
        "outputs:\n",
        "  resource_group_name: \"${rg.name}\"\n",
        "  identity_id: \"${identity.id}\"\n",
    ))
}

/// Write `content` as `Stackfile` inside `dir`.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_stackfile(dir: &Path, content: &str) -> Result<PathBuf> {
    let path = dir.join("Stackfile");
    fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
