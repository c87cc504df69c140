//! Paperchat: the main entry point.
//!
//! Loads configuration (`.env`, optional TOML file, environment), checks
//! that a backend credential is present, then serves the chat UI.

use clap::Parser;
use paperchat_config::{AppConfig, ConfigError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "paperchat",
    about = "Paperchat: chat with an LLM about your PDFs",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to a TOML config file (default: ~/.paperchat/config.toml)
    #[arg(short, long, env = "PAPERCHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_config_error(&e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "Configuration loaded");

    println!("Paperchat");
    println!("   Model:    {}", config.model_name);
    println!("   Memory:   last {} exchanges", config.memory.max_messages);
    println!(
        "   Open:     http://{}:{}",
        config.gateway.host, config.gateway.port
    );

    match paperchat_gateway::start(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load and validate configuration, failing fast without an API key.
fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, ConfigError> {
    let config = AppConfig::load(path)?;
    if !config.is_local_provider() {
        config.require_api_key()?;
    }
    Ok(config)
}

fn report_config_error(err: &ConfigError) {
    tracing::error!(error = %err, "Startup aborted");
    eprintln!();
    eprintln!("  ERROR: {err}");
    if matches!(err, ConfigError::MissingApiKey) {
        eprintln!();
        eprintln!("  Set it in the environment or in a .env file next to where you run paperchat:");
        eprintln!("    API_KEY=your-key");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    }
    eprintln!();
}
