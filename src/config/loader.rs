//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;

pub const CONFIG_FILENAME: &str = "waiedu.toml";

/// Load configuration from waiedu.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let config = parse_config(&content)?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse configuration text after interpolating environment variables
pub fn parse_config(content: &str) -> Result<Config> {
    let content = interpolate_env_vars(content);
    Ok(toml::from_str(&content)?)
}

/// Find the configuration file, searching upward from current directory
pub fn find_config_file() -> Result<PathBuf> {
    let current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;
    find_config_file_from(&current)
}

/// Find the configuration file, searching upward from `start`
pub fn find_config_file_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Constant pattern; failure here is a bug, not a runtime condition
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("valid env var pattern")
    })
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
pub fn interpolate_env_vars(content: &str) -> String {
    env_var_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .to_string()
}

/// Write the default configuration to `path`, refusing to overwrite
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    fs::write(path, default_config_content())?;
    Ok(())
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# WaiEdu API configuration

[server]
host = "${WAIEDU_HOST:-0.0.0.0}"
port = 5000

[auth]
# Required. Tokens signed with one secret are rejected by servers using another.
jwt_secret = "${JWT_SECRET_KEY:-}"
token_ttl_secs = 86400
bcrypt_cost = 10
reset_token_ttl_hours = 24
# Return reset tokens in the forgot-password reply; never enable in production
expose_reset_token = false

[database]
backend = "${WAIEDU_STORE:-memory}"  # or "postgres"
host = "${POSTGRES_HOST:-localhost}"
port = 5432
user = "${POSTGRES_USER:-postgres}"
password = "${POSTGRES_PASSWORD:-postgres}"
dbname = "${POSTGRES_DB:-waiedu}"
connect_retries = 3
retry_delay_ms = 1000
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    #[test]
    fn test_env_interpolation() {
        env::set_var("WAIEDU_TEST_VAR", "hello");
        let content = "value = \"${WAIEDU_TEST_VAR}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"hello\"");
        env::remove_var("WAIEDU_TEST_VAR");
    }

    #[test]
    fn test_env_interpolation_with_default() {
        let content = "value = \"${NONEXISTENT_VAR:-default_value}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"default_value\"");
    }

    #[test]
    fn test_lowercase_names_left_alone() {
        let content = "value = \"${not_a_var}\"";
        assert_eq!(interpolate_env_vars(content), content);
    }

    #[test]
    fn test_default_content_parses() {
        let config = parse_config(default_config_content()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.database.port, 5432);
        if env::var("WAIEDU_STORE").is_err() {
            assert_eq!(config.database.backend, StoreBackend::Memory);
        }
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        write_default_config(&path).unwrap();
        assert!(path.exists());
        assert!(write_default_config(&path).is_err());
    }

    #[test]
    fn test_find_config_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        let found = find_config_file_from(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILENAME));
    }
}
