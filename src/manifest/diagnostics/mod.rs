//! Translates manifest parsing errors into actionable diagnostics.
//!
//! [`ManifestSource`] retains the YAML content, [`ManifestName`] labels the
//! origin, and the mapping helpers ([`map_yaml_error`], [`map_data_error`])
//! convert parser and deserialisation failures into [`miette`] diagnostics
//! with spans, hints and stable codes.
//
// miette/thiserror derives trip unused_assignments on some toolchains only,
// so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use super::hints::DATA_HINTS;
use miette::Diagnostic;
use thiserror::Error;

mod yaml;

pub use yaml::map_yaml_error;

/// YAML source content for a manifest.
///
/// # Examples
/// ```rust
/// use azstack::manifest::ManifestSource;
/// let source = ManifestSource::from("project: demo");
/// assert_eq!(source.as_str(), "project: demo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestSource(String);

impl ManifestSource {
    /// Construct a new manifest source buffer from any owned string type.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// View the stored source contents as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestSource {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Display name for a manifest source used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestName(String);

impl ManifestName {
    /// Construct a diagnostic label describing the manifest being processed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Access the label as a borrowed string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ManifestName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ManifestName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ManifestName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Error raised when a manifest cannot be loaded.
///
/// # Examples
/// ```rust
/// use miette::MietteDiagnostic;
/// use azstack::manifest::ManifestError;
///
/// let err = ManifestError::Parse {
///     source: Box::new(MietteDiagnostic::new("bad manifest")),
///     name: "Stackfile".into(),
/// };
/// assert_eq!(err.to_string(), "failed to parse Stackfile");
/// ```
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// Manifest parsing failed and produced the supplied diagnostic.
    #[error("failed to parse {name}")]
    #[diagnostic(code(azstack::manifest::parse))]
    Parse {
        /// Underlying diagnostic reported by the parser or validator.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
        /// Manifest label.
        name: String,
    },

    /// The manifest targets a format this build does not understand.
    #[error("{name} declares stack_version {version}, which is not supported")]
    #[diagnostic(
        code(azstack::manifest::version),
        help("set stack_version to a {supported} release")
    )]
    UnsupportedVersion {
        /// Manifest label.
        name: String,
        /// Declared version.
        version: semver::Version,
        /// Supported requirement.
        supported: semver::VersionReq,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("{name} has an invalid structure: {source}")]
#[diagnostic(code(azstack::manifest::structure))]
struct DataDiagnostic {
    #[source]
    source: serde_json::Error,
    name: String,
    #[help]
    help: Option<String>,
}

/// Map a [`serde_json`] structural error into a diagnostic without a source
/// span. `serde_json` does not report byte offsets for data validation
/// failures, so the resulting diagnostic only carries the manifest name and
/// error message.
#[must_use]
pub fn map_data_error(
    err: serde_json::Error,
    name: &ManifestName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let details = err.to_string();
    let help = DATA_HINTS
        .iter()
        .find(|(needle, _)| details.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned());
    Box::new(DataDiagnostic {
        source: err,
        name: name.to_string(),
        help,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use miette::Diagnostic;
    use serde_json::Value;

    #[test]
    fn map_data_error_formats_message_and_code() -> Result<()> {
        let name = ManifestName::new("test.json");
        let err = serde_json::from_str::<Value>("{\"key\":}")
            .expect_err("expected serde_json parse error");
        let details = err.to_string();
        let diag = map_data_error(err, &name);
        let message = diag.to_string();
        ensure!(
            message == format!("test.json has an invalid structure: {details}"),
            "unexpected message: {message}"
        );
        let code = diag
            .code()
            .map(|c| c.to_string())
            .context("structure diagnostic should expose a code")?;
        ensure!(
            code == "azstack::manifest::structure",
            "unexpected diagnostic code {code}"
        );
        Ok(())
    }

    #[test]
    fn map_data_error_suggests_resource_kinds() -> Result<()> {
        let name = ManifestName::new("Stackfile");
        let err = serde_json::from_value::<crate::ast::ResourceDecl>(serde_json::json!({
            "kind": "storage_account",
            "id": "s",
        }))
        .expect_err("unknown kind should fail");
        let diag = map_data_error(err, &name);
        let help = diag
            .help()
            .map(|h| h.to_string())
            .context("unknown kind should carry help")?;
        ensure!(help.contains("redis_cache"), "unexpected help: {help}");
        Ok(())
    }

    #[test]
    fn map_data_error_is_wrapped_by_manifest_error() -> Result<()> {
        let name = ManifestName::new("example");
        let err = serde_json::from_str::<Value>("not json")
            .expect_err("expected serde_json parse failure");
        let wrapped = ManifestError::Parse {
            source: map_data_error(err, &name),
            name: name.to_string(),
        };
        ensure!(
            wrapped.to_string() == "failed to parse example",
            "unexpected outer error message: {wrapped}"
        );
        let inner_code = match &wrapped {
            ManifestError::Parse { source, .. } => source
                .code()
                .map(|c| c.to_string())
                .context("source diagnostic should have a code")?,
            ManifestError::UnsupportedVersion { .. } => String::new(),
        };
        ensure!(
            inner_code == "azstack::manifest::structure",
            "unexpected inner diagnostic code {inner_code}"
        );
        Ok(())
    }
}
