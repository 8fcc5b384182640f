use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

pub(crate) type ConfigMap = HashMap<String, ConfigValue>;

/// Read a YAML file into the map. A missing file is not an error.
pub(crate) fn load_yaml_file(path: &Path, values: &mut ConfigMap) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))
}

pub(crate) fn load_yaml_str(content: &str, values: &mut ConfigMap) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
///
/// Sequences are stored whole under their key and once more per element
/// (`key.0`, `key.1`, ...).
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut ConfigMap) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let segment = ConfigValue::yaml_key(k);
                let key = if prefix.is_empty() {
                    segment
                } else {
                    format!("{prefix}.{segment}")
                };
                flatten_yaml(&key, v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(value));
            for (i, item) in seq.iter().enumerate() {
                flatten_yaml(&format!("{prefix}.{i}"), item, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

/// Dot form of a key with underscores folded into separators.
///
/// Both `DATABASE_MAX_CONNECTIONS` and `database.max_connections` normalize
/// to `database.max.connections`, which is how environment variables find
/// the YAML keys they override.
pub(crate) fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace('_', ".")
}

/// Overlay environment variables onto the map.
///
/// Each variable is stored under its normalized key and also replaces every
/// existing key with the same normalized form.
pub(crate) fn overlay_env<I>(vars: I, values: &mut ConfigMap)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (env_key, env_val) in vars {
        let normalized = normalize_key(&env_key);
        let shadowed: Vec<String> = values
            .keys()
            .filter(|k| **k != normalized && normalize_key(k) == normalized)
            .cloned()
            .collect();
        for key in shadowed {
            values.insert(key, ConfigValue::String(env_val.clone()));
        }
        values.insert(normalized, ConfigValue::String(env_val));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_underscored_yaml_keys() {
        let mut values = ConfigMap::new();
        load_yaml_str("database:\n  max_connections: 5\n", &mut values).unwrap();
        overlay_env(
            [("DATABASE_MAX_CONNECTIONS".to_string(), "9".to_string())],
            &mut values,
        );
        assert!(matches!(
            values.get("database.max_connections"),
            Some(ConfigValue::String(s)) if s == "9"
        ));
    }

    #[test]
    fn top_level_scalars_are_ignored() {
        let mut values = ConfigMap::new();
        load_yaml_str("42", &mut values).unwrap();
        assert!(values.is_empty());
    }
}
