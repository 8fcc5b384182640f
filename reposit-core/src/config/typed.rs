use super::{ConfigError, RepositConfig};

/// A strongly-typed configuration section read from the keys under `prefix()`.
///
/// ```ignore
/// pub struct CacheConfig {
///     pub ttl_secs: u64,
/// }
///
/// impl ConfigProperties for CacheConfig {
///     fn prefix() -> &'static str { "cache" }
///
///     fn from_config(config: &RepositConfig) -> Result<Self, ConfigError> {
///         Ok(Self { ttl_secs: config.get_or("cache.ttl_secs", 60) })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"database"`).
    fn prefix() -> &'static str;

    fn from_config(config: &RepositConfig) -> Result<Self, ConfigError>;

    /// Absolute key for a property of this section.
    fn key(property: &str) -> String {
        format!("{}.{property}", Self::prefix())
    }
}
