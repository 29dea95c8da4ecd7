//! Configuration loading tests
//!
//! Run with: cargo test --test config_tests

use std::fs;
use tempfile::TempDir;

use waiedu::config::{self, load_config_from_path, StoreBackend, CONFIG_FILENAME};
use waiedu::error::Error;

#[test]
fn test_init_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILENAME);

    config::write_default_config(&path).unwrap();
    let loaded = load_config_from_path(&path).unwrap();

    assert_eq!(loaded.server.port, 5000);
    assert_eq!(loaded.auth.token_ttl_secs, 86_400);
    assert_eq!(loaded.auth.bcrypt_cost, 10);
    assert!(!loaded.auth.expose_reset_token);

    // The default file ships without a secret unless the environment has one
    if std::env::var("JWT_SECRET_KEY").is_err() {
        assert!(loaded.validate().is_err());
    }
}

#[test]
fn test_secret_and_backend_from_environment() {
    std::env::set_var("WAIEDU_IT_SECRET", "from-env");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILENAME);
    fs::write(
        &path,
        r#"
[auth]
jwt_secret = "${WAIEDU_IT_SECRET}"
token_ttl_secs = 60

[database]
backend = "${WAIEDU_IT_BACKEND:-postgres}"
password = "hunter2"
"#,
    )
    .unwrap();

    let loaded = load_config_from_path(&path).unwrap();
    std::env::remove_var("WAIEDU_IT_SECRET");

    assert_eq!(loaded.auth.jwt_secret, "from-env");
    assert_eq!(loaded.auth.token_ttl_secs, 60);
    assert_eq!(loaded.database.backend, StoreBackend::Postgres);
    assert_eq!(loaded.database.dbname, "waiedu");
    assert!(loaded.validate().is_ok());

    // Debug output never shows the password
    assert!(!format!("{:?}", loaded.database).contains("hunter2"));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let loaded = config::loader::parse_config(
        r#"
[auth]
jwt_secret = "s"
bcrypt_cost = 2
"#,
    )
    .unwrap();
    let err = loaded.validate().unwrap_err();
    assert!(err.to_string().contains("bcrypt_cost"));

    let err = config::loader::parse_config("[server\nport = 1").unwrap_err();
    assert!(matches!(err, Error::TomlParse(_)));
}

#[test]
fn test_missing_file_suggests_init() {
    let dir = TempDir::new().unwrap();
    let err = load_config_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound));
    assert!(err.to_string().contains("waiedu init"));
}
