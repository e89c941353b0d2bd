//! Secret binding.
//!
//! Secrets are declared once in a Stackfile's `secrets:` block and referenced
//! by name. Environment-sourced secrets are read through [`mockable::Env`] when
//! the graph is built so that a missing value stops the run before anything
//! is emitted. Generated secrets are left to the engine's random provider and
//! only their parameters travel with the graph.

use crate::ast::{GenerateSpec, SecretSource};
use mockable::Env;
use serde::Serialize;
use std::env::VarError;
use std::fmt;
use thiserror::Error;

/// A secret string whose `Debug` output is redacted.
///
/// ```
/// use azstack::secrets::SecretValue;
///
/// let value = SecretValue::new("hunter2");
/// assert_eq!(format!("{value:?}"), "SecretValue(***)");
/// assert_eq!(value.expose(), "hunter2");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap `value`.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The plain secret. Only the engine hand-off should call this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

/// A secret after its source has been consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SecretBinding {
    /// Value read from the environment; supplied to the engine as secret
    /// configuration.
    Env {
        /// Variable the value came from.
        variable: String,
        /// The value itself. Never serialised.
        #[serde(skip)]
        value: SecretValue,
    },
    /// Value produced by the engine's random provider.
    Generated(GenerateSpec),
}

impl SecretBinding {
    /// Whether the engine creates this secret as a resource.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Errors raised while binding secrets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    /// The variable backing a secret is missing or unusable.
    #[error("secret '{secret}' requires environment variable {variable}: {reason}")]
    MissingSecret {
        /// Secret name.
        secret: String,
        /// Environment variable consulted.
        variable: String,
        /// Why the value could not be used.
        reason: &'static str,
    },
    /// A generated secret cannot be produced with the requested parameters.
    #[error("secret '{secret}' must have a positive length")]
    EmptyGenerated {
        /// Secret name.
        secret: String,
    },
}

/// Resolve `source` for the secret called `name`.
///
/// # Errors
///
/// Returns [`SecretError::MissingSecret`] when the environment variable is
/// unset, empty, or not valid UTF-8, and [`SecretError::EmptyGenerated`] for a
/// zero-length generated secret.
pub fn bind<E: Env + ?Sized>(
    env: &E,
    name: &str,
    source: &SecretSource,
) -> Result<SecretBinding, SecretError> {
    match source {
        SecretSource::Env(variable) => {
            let missing = |reason| SecretError::MissingSecret {
                secret: name.to_owned(),
                variable: variable.clone(),
                reason,
            };
            let value = match env.raw(variable) {
                Ok(value) if value.is_empty() => return Err(missing("value is empty")),
                Ok(value) => value,
                Err(VarError::NotPresent) => return Err(missing("variable is not set")),
                Err(VarError::NotUnicode(_)) => return Err(missing("value is not valid UTF-8")),
            };
            tracing::debug!(secret = name, variable = %variable, "bound secret from environment");
            Ok(SecretBinding::Env {
                variable: variable.clone(),
                value: SecretValue::new(value),
            })
        }
        SecretSource::Generate(spec) => {
            if spec.length == 0 {
                return Err(SecretError::EmptyGenerated {
                    secret: name.to_owned(),
                });
            }
            Ok(SecretBinding::Generated(spec.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;

    fn env_returning(result: Result<String, VarError>) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_raw()
            .withf(|key| key == "SECRET_KEY")
            .returning(move |_| result.clone());
        env
    }

    #[rstest]
    fn env_secret_is_bound() {
        let env = env_returning(Ok("s3cr3t".into()));
        let binding = bind(&env, "django", &SecretSource::Env("SECRET_KEY".into()))
            .expect("bind secret");
        let SecretBinding::Env { variable, value } = binding else {
            panic!("expected environment binding");
        };
        assert_eq!(variable, "SECRET_KEY");
        assert_eq!(value.expose(), "s3cr3t");
    }

    #[rstest]
    #[case(Err(VarError::NotPresent), "is not set")]
    #[case(Ok(String::new()), "is empty")]
    fn unusable_env_secret_fails(#[case] result: Result<String, VarError>, #[case] needle: &str) {
        let env = env_returning(result);
        let err = bind(&env, "django", &SecretSource::Env("SECRET_KEY".into()))
            .expect_err("binding should fail");
        assert!(err.to_string().contains(needle), "got: {err}");
        assert!(err.to_string().contains("SECRET_KEY"));
    }

    #[rstest]
    fn generated_secret_keeps_parameters() {
        let env = MockEnv::new();
        let spec = GenerateSpec::default();
        let binding = bind(&env, "key", &SecretSource::Generate(spec.clone())).expect("bind");
        assert_eq!(binding, SecretBinding::Generated(spec));
        assert!(binding.is_generated());
    }

    #[rstest]
    fn secret_value_never_serialises() {
        let binding = SecretBinding::Env {
            variable: "PW".into(),
            value: SecretValue::new("hunter2"),
        };
        let json = serde_json::to_string(&binding).expect("serialise");
        assert!(!json.contains("hunter2"), "leaked: {json}");
        assert!(!format!("{binding:?}").contains("hunter2"));
    }
}
