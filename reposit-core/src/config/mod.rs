mod loader;
pub mod typed;
pub mod value;

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub use typed::ConfigProperties;
pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Layered configuration: YAML files, `.env` files, then environment variables.
///
/// `RepositConfig` (= `RepositConfig<()>`) provides raw key-value access only.
/// `RepositConfig<T>` adds typed access to a config section via `Deref<Target = T>`.
///
/// Resolution order (lowest to highest priority):
/// 1. `reposit.yaml`
/// 2. `reposit-{profile}.yaml`
/// 3. `.env`, then `.env.{profile}` (loaded into the process environment)
/// 4. Environment variables (`DATABASE_URL` overrides `database.url`)
///
/// `.env` files never overwrite already-set environment variables.
///
/// Profile is determined by: `REPOSIT_PROFILE` env var > argument.
#[derive(Debug, Clone)]
pub struct RepositConfig<T = ()> {
    values: HashMap<String, ConfigValue>,
    profile: String,
    typed: T,
}

impl RepositConfig {
    /// Load configuration for the given profile from the working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load configuration with YAML files looked up in `dir`.
    ///
    /// `.env` files are still read from the working directory.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile =
            std::env::var("REPOSIT_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("reposit.yaml"), &mut values)?;
        loader::load_yaml_file(
            &dir.join(format!("reposit-{active_profile}.yaml")),
            &mut values,
        )?;

        let _ = dotenvy::dotenv();
        let _ = dotenvy::from_filename(PathBuf::from(format!(".env.{active_profile}")));

        loader::overlay_env(std::env::vars(), &mut values);

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");

        Ok(RepositConfig {
            values,
            profile: active_profile,
            typed: (),
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(RepositConfig {
            values,
            profile: profile.to_string(),
            typed: (),
        })
    }

    pub fn empty() -> Self {
        RepositConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
            typed: (),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Upgrade to a typed config by constructing `C` from the raw values.
    ///
    /// ```ignore
    /// let config = RepositConfig::load("dev")?.with_typed::<DatabaseConfig>()?;
    /// config.url                            // typed field access via Deref
    /// config.get::<String>("database.url")  // raw access still works
    /// ```
    pub fn with_typed<C: ConfigProperties>(self) -> Result<RepositConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(RepositConfig {
            values: self.values,
            profile: self.profile,
            typed,
        })
    }
}

impl<T> RepositConfig<T> {
    /// Get a typed value for the given dot-separated key.
    ///
    /// Falls back to the key with underscores read as separators, so values
    /// that only exist as environment variables are still found.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .or_else(|| self.values.get(&loader::normalize_key(key)))
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning a default if the key is missing or invalid.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.values.contains_key(&loader::normalize_key(key))
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// Downgrade to a raw (untyped) config, discarding the typed layer.
    pub fn raw(&self) -> RepositConfig {
        RepositConfig {
            values: self.values.clone(),
            profile: self.profile.clone(),
            typed: (),
        }
    }
}

impl<T> Deref for RepositConfig<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.typed
    }
}
