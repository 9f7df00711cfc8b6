//! QAChat - Terminal client for the QAChat RAG server
//!
//! Main entry point for the qachat application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qachat::cli::{Cli, Commands};
use qachat::commands;
use qachat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing; --verbose widens the default filter
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { kb, session } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(k) = &kb {
                tracing::debug!("Using knowledge base override: {}", k);
            }
            if let Some(s) = &session {
                tracing::debug!("Resuming session: {}", s);
            }

            commands::chat::run_chat(config, kb, session).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting session command");
            commands::sessions::handle_sessions(&config, command)?;
            Ok(())
        }
        Commands::Kb { command } => {
            tracing::info!("Starting knowledge base command");
            commands::knowledge::handle_kb(&config, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "qachat=debug" } else { "qachat=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
