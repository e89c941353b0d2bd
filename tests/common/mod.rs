//! Shared helpers for integration tests.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use anyhow::{Context, Result};
use azstack::ast::StackManifest;
use azstack::ir::{BuildContext, ResourceGraph};
use azstack::manifest;
use mockable::MockEnv;
use std::path::PathBuf;

/// Path of a file under `tests/data`.
pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

/// Path of the reference `Stackfile` at the repository root.
pub fn reference_stackfile() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Stackfile")
}

/// Load the fixture `name` from `tests/data`.
pub fn load_fixture(name: &str) -> Result<StackManifest> {
    manifest::from_path(data_path(name)).with_context(|| format!("load fixture {name}"))
}

/// Load the reference `Stackfile`.
pub fn load_reference() -> Result<StackManifest> {
    manifest::from_path(reference_stackfile())
}

/// An environment answering every lookup with `value-of-<KEY>`.
pub fn env_with_values() -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_raw()
        .returning(|key| Ok(format!("value-of-{key}")));
    env
}

/// Build `manifest` against `env_with_values`.
pub fn build(manifest: &StackManifest) -> Result<ResourceGraph> {
    let env = env_with_values();
    Ok(ResourceGraph::from_manifest(manifest, &BuildContext::new(&env))?)
}
