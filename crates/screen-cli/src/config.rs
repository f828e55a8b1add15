//! Layered configuration for the command-line front end.
//!
//! Values are resolved with the following precedence, highest first: command-line
//! flags, `-S key=value` overrides, the TOML settings file, built-in defaults.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_convert_config, build_ledger_target, build_run_config};
pub use models::{AppConfig, ConvertConfig, LedgerTarget};
