//! Ambient runtime pieces shared by the reposit crates: layered
//! configuration, the typed database section and tracing setup.

pub mod config;
pub mod database;
pub mod tracing_setup;

pub use config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, RepositConfig};
pub use database::DatabaseConfig;
pub use tracing_setup::{init_tracing, try_init_tracing, LogFormat};
