//! CLI command implementations

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::api;
use crate::auth::{hash_password, password::DEFAULT_COST, SessionClaims, TokenService};
use crate::cli::{error, info, print_claims, success, warn};
use crate::config::{self, Config, CONFIG_FILENAME};

/// Write a default waiedu.toml
pub async fn init(path: Option<&Path>) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));

    if config_path.exists() {
        warn(&format!("{} already exists", config_path.display()));
        return Ok(());
    }

    config::write_default_config(&config_path)?;

    success(&format!("Created {}", config_path.display()));
    info("Set JWT_SECRET_KEY (or edit [auth].jwt_secret) and run 'waiedu serve'");

    Ok(())
}

/// Run the HTTP API until interrupted
pub async fn serve(path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(path)?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting API server on http://{}:{}", host, port));

    if let Err(e) = api::run_server(config, &host, port).await {
        error(&format!("Server stopped: {}", e));
        return Err(e.into());
    }

    Ok(())
}

/// Print a bcrypt hash for seeding users by hand
pub async fn hash_password_cmd(path: Option<&Path>, password: &str, cost: Option<u32>) -> Result<()> {
    let cost = match cost {
        Some(cost) => cost,
        None => config_cost(path),
    };

    let hash = hash_password(password, cost)?;
    println!("{}", hash.as_str());

    Ok(())
}

/// Sign a token for `user_id`
pub async fn token_issue(path: Option<&Path>, user_id: i64, ttl: Option<i64>) -> Result<()> {
    let config = load_config(path)?;
    let tokens = token_service(&config)?;
    let ttl = ttl.unwrap_or(config.auth.token_ttl_secs);

    let token = tokens.issue_with_ttl(&SessionClaims::for_subject(user_id), ttl)?;
    println!("{}", token);

    Ok(())
}

/// Verify a token and show what it carries
pub async fn token_inspect(path: Option<&Path>, token: &str) -> Result<()> {
    let config = load_config(path)?;
    let tokens = token_service(&config)?;

    match tokens.verify(token) {
        Ok(claims) => {
            success("Token is valid");
            print_claims(&claims);
            Ok(())
        }
        Err(failure) => {
            error(&format!("Token rejected: {}", failure));
            Err(failure.into())
        }
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => config::load_config_from_path(path),
        None => config::load_config(),
    };
    config.map_err(|e| anyhow::anyhow!("{}", e))
}

fn token_service(config: &Config) -> Result<TokenService> {
    config.validate()?;
    Ok(TokenService::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.token_ttl_secs,
    ))
}

fn config_cost(path: Option<&Path>) -> u32 {
    match load_config(path) {
        Ok(config) => config.auth.bcrypt_cost,
        Err(_) => DEFAULT_COST,
    }
}
