use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waiedu::cli::{self, Cli, Commands, TokenAction};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waiedu=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => cli::commands::init(config).await,
        Commands::Serve { host, port } => cli::commands::serve(config, host, port).await,
        Commands::HashPassword { password, cost } => {
            cli::commands::hash_password_cmd(config, &password, cost).await
        }
        Commands::Token { action } => match action {
            TokenAction::Issue { user_id, ttl } => {
                cli::commands::token_issue(config, user_id, ttl).await
            }
            TokenAction::Inspect { token } => cli::commands::token_inspect(config, &token).await,
        },
    }
}
