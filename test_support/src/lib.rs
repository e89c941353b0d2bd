//! Test utilities shared by the crate's unit and integration tests.
//!
//! Helpers cover environment mutation, stand-in engine executables, Stackfile
//! fixtures and running the built `azstack` binary.

pub mod azstack;
pub mod env_lock;
pub mod env_var_guard;
pub mod exec;
pub mod manifest;
pub mod pulumi;

pub use azstack::{AzstackRun, run_azstack_in};
pub use env_var_guard::EnvVarGuard;
pub use exec::{make_executable, write_exec};
pub use pulumi::{FakePulumi, fake_pulumi};
