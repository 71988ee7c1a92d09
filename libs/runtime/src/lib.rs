//! Process-level plumbing shared by the binaries: layered configuration and
//! logging initialization.

pub mod config;
pub mod logging;

pub use config::{AppConfig, CliArgs, DatabaseConfig, LoggingConfig, ServerConfig};
