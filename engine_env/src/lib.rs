#![forbid(unsafe_code)]

//! Environment variable names shared by the azstack binary, its tests and
//! the test helpers.

/// Environment variable overriding the Pulumi executable used by the runner.
///
/// # Examples
///
/// ```
/// use engine_env::PULUMI_ENV;
/// assert_eq!(PULUMI_ENV, "AZSTACK_PULUMI");
/// ```
pub const PULUMI_ENV: &str = "AZSTACK_PULUMI";

/// Environment variable selecting the stack name when `--stack` is omitted.
pub const STACK_ENV: &str = "AZSTACK_STACK";

/// Environment variable holding the Azure subscription used for import ids.
pub const SUBSCRIPTION_ENV: &str = "ARM_SUBSCRIPTION_ID";
