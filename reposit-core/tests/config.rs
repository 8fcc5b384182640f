use reposit_core::config::{ConfigError, ConfigProperties, ConfigValue, RepositConfig};
use reposit_core::{DatabaseConfig, LogFormat};
use serial_test::serial;

#[test]
fn test_empty_config() {
    let config = RepositConfig::empty();
    assert!(matches!(
        config.get::<String>("nonexistent"),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_set_and_get() {
    let mut config = RepositConfig::empty();
    config.set("database.url", ConfigValue::String("sqlite::memory:".into()));
    assert_eq!(
        config.get::<String>("database.url").unwrap(),
        "sqlite::memory:"
    );
}

#[test]
fn test_get_or_default() {
    let config = RepositConfig::empty();
    assert_eq!(config.get_or("missing", 42i64), 42);
}

#[test]
fn test_type_conversions() {
    let mut config = RepositConfig::empty();
    config.set("int_val", ConfigValue::Integer(42));
    config.set("float_val", ConfigValue::Float(2.5));
    config.set("bool_val", ConfigValue::String("yes".into()));
    config.set("null_val", ConfigValue::Null);

    assert_eq!(config.get::<i64>("int_val").unwrap(), 42);
    assert_eq!(config.get::<f64>("float_val").unwrap(), 2.5);
    assert!(config.get::<bool>("bool_val").unwrap());
    assert_eq!(config.get::<String>("int_val").unwrap(), "42");
    assert!(config.get::<Option<String>>("null_val").unwrap().is_none());
}

#[test]
fn test_integer_range_is_checked() {
    let mut config = RepositConfig::empty();
    config.set("level", ConfigValue::Integer(256));
    assert!(matches!(
        config.get::<u8>("level"),
        Err(ConfigError::TypeMismatch { expected: "u8", .. })
    ));
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
database:
  url: "sqlite::memory:"
  max_connections: 10
logging:
  format: json
"#;
    let config = RepositConfig::from_yaml_str(yaml, "test").unwrap();

    assert_eq!(config.get::<String>("database.url").unwrap(), "sqlite::memory:");
    assert_eq!(config.get::<u32>("database.max_connections").unwrap(), 10);
    assert_eq!(LogFormat::from_config(&config), LogFormat::Json);
}

#[test]
fn test_list_config() {
    let yaml = r#"
tables:
  - "owner_account"
  - "test_item"
"#;
    let config = RepositConfig::from_yaml_str(yaml, "test").unwrap();
    let tables: Vec<String> = config.get("tables").unwrap();
    assert_eq!(tables, vec!["owner_account", "test_item"]);
    assert_eq!(config.get::<String>("tables.1").unwrap(), "test_item");
}

#[test]
fn test_invalid_yaml_is_a_load_error() {
    let err = RepositConfig::from_yaml_str("database: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_with_typed_database_section() {
    let yaml = r#"
database:
  url: "postgres://localhost/app"
  max_connections: 20
  idle_timeout_secs: 600
"#;
    let config = RepositConfig::from_yaml_str(yaml, "staging")
        .unwrap()
        .with_typed::<DatabaseConfig>()
        .unwrap();

    assert_eq!(config.url, "postgres://localhost/app");
    assert_eq!(config.max_connections, 20);
    assert_eq!(config.min_connections, 0);
    assert_eq!(config.idle_timeout_secs, Some(600));
    assert_eq!(config.max_lifetime_secs, None);
    assert_eq!(config.profile(), "staging");
    assert_eq!(DatabaseConfig::prefix(), "database");

    let raw = config.raw();
    assert_eq!(raw.get::<i64>("database.max_connections").unwrap(), 20);
}

#[test]
#[serial]
fn test_load_layers_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("reposit.yaml"),
        "database:\n  url: sqlite://base.db\n  max_connections: 5\n  min_connections: 1\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("reposit-prod.yaml"),
        "database:\n  url: sqlite://prod.db\n",
    )
    .unwrap();

    std::env::remove_var("REPOSIT_PROFILE");
    std::env::set_var("DATABASE_MAX_CONNECTIONS", "12");

    let config = RepositConfig::load_from(dir.path(), "prod")
        .unwrap()
        .with_typed::<DatabaseConfig>()
        .unwrap();

    std::env::remove_var("DATABASE_MAX_CONNECTIONS");

    assert_eq!(config.profile(), "prod");
    assert_eq!(config.url, "sqlite://prod.db");
    assert_eq!(config.max_connections, 12);
    assert_eq!(config.min_connections, 1);
}

#[test]
#[serial]
fn test_profile_env_var_wins_over_argument() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("reposit-ci.yaml"),
        "database:\n  url: sqlite://ci.db\n",
    )
    .unwrap();

    std::env::set_var("REPOSIT_PROFILE", "ci");
    let config = RepositConfig::load_from(dir.path(), "dev");
    std::env::remove_var("REPOSIT_PROFILE");

    let config = config.unwrap();
    assert_eq!(config.profile(), "ci");
    assert_eq!(config.get::<String>("database.url").unwrap(), "sqlite://ci.db");
}

#[test]
#[serial]
fn test_env_only_value_is_found_by_underscored_key() {
    std::env::set_var("DATABASE_ACQUIRE_TIMEOUT_SECS", "7");
    let dir = tempfile::tempdir().unwrap();
    let config = RepositConfig::load_from(dir.path(), "dev");
    std::env::remove_var("DATABASE_ACQUIRE_TIMEOUT_SECS");

    let config = config.unwrap();
    assert_eq!(config.get::<u64>("database.acquire_timeout_secs").unwrap(), 7);
    assert!(config.contains_key("database.acquire_timeout_secs"));
}
