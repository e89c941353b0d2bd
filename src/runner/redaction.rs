//! Argument redaction for logged engine command lines.

/// A single command-line argument as logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArg(String);

impl CommandArg {
    /// Wrap `arg`.
    #[must_use]
    pub fn new(arg: impl Into<String>) -> Self {
        Self(arg.into())
    }

    /// Borrow the argument text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const REDACTED: &str = "***REDACTED***";

fn is_sensitive_key(key: &str) -> bool {
    const SENSITIVE_FRAGMENTS: [&str; 6] =
        ["password", "secret", "token", "api_key", "apikey", "auth"];
    let lower = key.to_ascii_lowercase();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

/// Redact the value of a sensitive `key=value` argument, keeping the key.
///
/// ```
/// use azstack::runner::{CommandArg, redact_argument};
///
/// let arg = CommandArg::new("POSTGRES_ADMIN_PASSWORD=hunter2");
/// assert_eq!(redact_argument(&arg).as_str(), "POSTGRES_ADMIN_PASSWORD=***REDACTED***");
/// let arg = CommandArg::new("--cwd=/tmp/secrets");
/// assert_eq!(redact_argument(&arg).as_str(), "--cwd=/tmp/secrets");
/// ```
#[must_use]
pub fn redact_argument(arg: &CommandArg) -> CommandArg {
    match arg.as_str().split_once('=') {
        Some((key, _)) if is_sensitive_key(key.trim()) => {
            CommandArg::new(format!("{}={REDACTED}", key.trim()))
        }
        _ => arg.clone(),
    }
}

/// Redact every argument in `args`.
#[must_use]
pub fn redact_sensitive_args(args: &[CommandArg]) -> Vec<CommandArg> {
    args.iter().map(redact_argument).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("token=abc", "token=***REDACTED***")]
    #[case("  Django_Secret_Key = x ", "Django_Secret_Key=***REDACTED***")]
    #[case("--cwd=/var/secrets", "--cwd=/var/secrets")]
    #[case("django_secret_key", "django_secret_key")]
    #[case("stack", "stack")]
    fn redacts_only_sensitive_pairs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(redact_argument(&CommandArg::new(input)).as_str(), expected);
    }

    #[rstest]
    fn redacts_each_argument() {
        let args = [CommandArg::new("config"), CommandArg::new("password=1")];
        let redacted = redact_sensitive_args(&args);
        assert_eq!(redacted[0].as_str(), "config");
        assert_eq!(redacted[1].as_str(), "password=***REDACTED***");
    }
}
