//! Manifest loading helpers.
//!
//! A `Stackfile` is parsed as plain YAML first; Jinja expressions are then
//! evaluated inside string values only, so the document structure never
//! depends on template output. Templates see the manifest's `vars` as globals
//! and an `env()` helper that fails fast when a variable is missing.
//!
//! `${resource.attribute}` references are not Jinja syntax and pass through
//! rendering untouched; they are resolved later by the graph builder.

use crate::ast::StackManifest;
use anyhow::{Context, Result};
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, value::Value};
use semver::VersionReq;
use serde::de::Error as _;
use std::{fs, path::Path};

mod diagnostics;
mod hints;
mod render;

/// JSON representation of a manifest node after YAML parsing.
pub type ManifestValue = serde_json::Value;

pub use diagnostics::{
    ManifestError, ManifestName, ManifestSource, map_data_error, map_yaml_error,
};
pub use render::render_value;

/// Manifest format versions this build reads.
pub const SUPPORTED_VERSIONS: &str = "^1";

/// Resolve the value of an environment variable for the `env()` Jinja helper.
///
/// Missing or empty variables raise an undefined error and non-UTF-8 values
/// an invalid-operation error, so rendering halts instead of producing an
/// empty string.
fn env_var(name: &str) -> std::result::Result<String, Error> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => Ok(val),
        Ok(_) => Err(Error::new(
            ErrorKind::UndefinedError,
            format!("environment variable '{name}' is empty"),
        )),
        Err(std::env::VarError::NotPresent) => Err(Error::new(
            ErrorKind::UndefinedError,
            format!("environment variable '{name}' is not set"),
        )),
        Err(std::env::VarError::NotUnicode(_)) => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("environment variable '{name}' is not valid UTF-8"),
        )),
    }
}

fn template_env(doc: &ManifestValue, name: &ManifestName) -> Result<Environment<'static>> {
    let mut jinja = Environment::new();
    jinja.set_undefined_behavior(UndefinedBehavior::Strict);
    jinja.add_function("env", |var_name: String| env_var(&var_name));

    if let Some(vars_value) = doc.get("vars") {
        let vars = vars_value
            .as_object()
            .ok_or_else(|| ManifestError::Parse {
                source: map_data_error(
                    serde_json::Error::custom("`vars` must be a mapping with string keys"),
                    name,
                ),
                name: name.to_string(),
            })?;
        for (key, value) in vars {
            jinja.add_global(key.clone(), Value::from_serialize(value));
        }
    }
    Ok(jinja)
}

fn check_version(manifest: &StackManifest, name: &ManifestName) -> Result<(), ManifestError> {
    let supported = VersionReq::parse(SUPPORTED_VERSIONS).map_err(|err| ManifestError::Parse {
        source: map_data_error(serde_json::Error::custom(err), name),
        name: name.to_string(),
    })?;
    if supported.matches(&manifest.stack_version) {
        Ok(())
    } else {
        Err(ManifestError::UnsupportedVersion {
            name: name.to_string(),
            version: manifest.stack_version.clone(),
            supported,
        })
    }
}

/// Parse a manifest string, labelling diagnostics with `name`.
///
/// # Errors
///
/// Returns an error if YAML parsing, template rendering or deserialisation
/// fails, or if the manifest declares an unsupported `stack_version`.
pub fn from_str_named(yaml: &str, name: &ManifestName) -> Result<StackManifest> {
    let mut doc: ManifestValue =
        serde_saphyr::from_str(yaml).map_err(|e| ManifestError::Parse {
            source: map_yaml_error(e, &ManifestSource::from(yaml), name),
            name: name.to_string(),
        })?;

    let jinja = template_env(&doc, name)?;
    render_value(&mut doc, &jinja, "")?;

    let manifest: StackManifest =
        serde_json::from_value(doc).map_err(|e| ManifestError::Parse {
            source: map_data_error(e, name),
            name: name.to_string(),
        })?;
    check_version(&manifest, name)?;
    tracing::debug!(
        project = %manifest.project,
        resources = manifest.resources.len(),
        "parsed manifest"
    );
    Ok(manifest)
}

/// Parse a manifest string.
///
/// # Errors
///
/// As for [`from_str_named`].
pub fn from_str(yaml: &str) -> Result<StackManifest> {
    from_str_named(yaml, &ManifestName::new("Stackfile"))
}

/// Load a [`StackManifest`] from the given file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the manifest is invalid.
pub fn from_path(path: impl AsRef<Path>) -> Result<StackManifest> {
    let path_ref = path.as_ref();
    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("failed to read {}", path_ref.display()))?;
    from_str_named(&data, &ManifestName::new(path_ref.display().to_string()))
}

#[cfg(test)]
mod tests;
