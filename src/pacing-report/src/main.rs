//! Pacing Report — delivery pacing and margin reporting for booked
//! media plans.
//!
//! Main entry point that loads configuration and starts the HTTP server.

use clap::Parser;
use pacing_api::{pacing_router, PacingState};
use pacing_core::config::AppConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pacing-report")]
#[command(about = "Delivery pacing and margin reporting service")]
#[command(version)]
struct Cli {
    /// Bind host (overrides config)
    #[arg(long, env = "PACING_REPORT__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "PACING_REPORT__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// API bearer token (overrides config)
    #[arg(long, env = "PACING_REPORT__API__TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pacing_report=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Pacing Report starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(token) = cli.token {
        config.api.token = token;
    }

    info!(
        host = %config.api.host,
        http_port = config.api.http_port,
        "Configuration loaded"
    );

    let state = PacingState::new(&config);
    let router = pacing_router(state);

    let addr = format!("{}:{}", config.api.host, config.api.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Pacing Report is ready to serve traffic");

    axum::serve(listener, router).await?;

    Ok(())
}
