//! CLI interface for WaiEdu

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "waiedu")]
#[command(version)]
#[command(about = "Education platform API server", long_about = None)]
pub struct Cli {
    /// Path to waiedu.toml (searched upward from the working directory by default)
    #[arg(short, long, global = true, env = "WAIEDU_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default waiedu.toml in the current directory
    Init,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides [server].host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides [server].port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a bcrypt hash for a password
    HashPassword {
        password: String,

        /// Work factor (defaults to [auth].bcrypt_cost, or 10 without a config file)
        #[arg(long)]
        cost: Option<u32>,
    },

    /// Issue or inspect session tokens with the configured secret
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Sign a token for a user id
    Issue {
        #[arg(short, long)]
        user_id: i64,

        /// Lifetime in seconds (defaults to [auth].token_ttl_secs)
        #[arg(short, long)]
        ttl: Option<i64>,
    },

    /// Verify a token and print its claims
    Inspect {
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["waiedu", "serve", "--host", "127.0.0.1", "-p", "8080"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["waiedu", "token", "inspect", "abc", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Commands::Token { action: TokenAction::Inspect { ref token } } if token == "abc"
        ));
    }

    #[test]
    fn test_token_issue_requires_user_id() {
        assert!(Cli::try_parse_from(["waiedu", "token", "issue"]).is_err());
    }
}
