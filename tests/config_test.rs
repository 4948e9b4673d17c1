//! Settings files and the clients built from them.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use polyql::config::{Settings, SettingsError};
use polyql::sql::Dialect;
use polyql::{Client, Error};

fn write_config(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("polyql_{}_{}.toml", name, std::process::id()));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_client_from_settings_file() {
    std::env::set_var("POLYQL_CONFIG_TEST_URL", "postgres://localhost/app");
    let path = write_config(
        "full",
        r#"
client = "pg"
connection = "${POLYQL_CONFIG_TEST_URL}"
use_null_as_default = true
acquire_connection_timeout_ms = 250
debug = true

[pool]
min = 1
max = 3
"#,
    );

    let settings = Settings::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(
        settings.resolved_connection().unwrap().as_deref(),
        Some("postgres://localhost/app")
    );

    let client = Client::from_settings(&settings).unwrap();
    assert_eq!(client.dialect(), Dialect::Postgres);
    let options = client.options();
    assert!(options.use_null_as_default);
    assert!(options.debug);
    assert!(options.log_sql);
    assert_eq!(options.acquire_connection_timeout, Duration::from_millis(250));
    std::env::remove_var("POLYQL_CONFIG_TEST_URL");
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("polyql_does_not_exist.toml");
    let err = Settings::from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::FileNotFound(p) if p == path));
}

#[test]
fn test_invalid_files_are_rejected() {
    let path = write_config("pool", "client = \"mysql\"\n\n[pool]\nmin = 5\nmax = 1\n");
    let err = Settings::from_file(&path).unwrap_err();
    fs::remove_file(&path).unwrap();
    assert_eq!(
        err.to_string(),
        "Invalid configuration: pool.min (5) is larger than pool.max (1)"
    );

    let path = write_config("syntax", "client = \n");
    let err = Settings::from_file(&path).unwrap_err();
    fs::remove_file(&path).unwrap();
    assert!(matches!(err, SettingsError::ParseError(_)));
}

#[test]
fn test_client_name_is_required() {
    let err = Client::from_settings(&Settings::default()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(
        err.to_string(),
        "Required configuration option 'client' is missing."
    );

    let settings = Settings::from_str("client = \"PG\"").unwrap();
    let err = Client::from_settings(&settings).unwrap_err();
    assert!(err.to_string().contains("case-sensitive"));
}

#[test]
fn test_unresolvable_time_zone_surfaces_as_settings_error() {
    let settings = Settings {
        client: Some("sqlite3".to_string()),
        time_zone: "mars".to_string(),
        ..Default::default()
    };
    let err = Client::from_settings(&settings).unwrap_err();
    assert!(matches!(err, Error::Settings(SettingsError::InvalidConfig(_))));
    assert_eq!(err.to_string(), "Invalid configuration: Invalid time_zone: mars");
}
