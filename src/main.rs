//! Vistamar booking engine — server binary
//!
//! Headless reservation-payment reconciliation service suitable for
//! deployment as a systemd service, Docker container, or standalone
//! process.
//!
//! ```sh
//! # Run with default config (~/.config/vistamar-booking/config.toml)
//! booking-service
//!
//! # Custom config path
//! booking-service --config /etc/vistamar/config.toml
//!
//! # Override the API port
//! booking-service --api-port 8080
//!
//! # Validate config without starting
//! booking-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use vistamar_booking::config::AppConfig;
use vistamar_booking::server::{init_tracing, ServerHandle, ServerOptions};

/// Vistamar booking engine — reservation and payment reconciliation server.
#[derive(Parser, Debug)]
#[command(
    name = "booking-service",
    version,
    about = "Reservation-payment lifecycle engine for tour agencies",
    long_about = "Vistamar booking engine — REST API server keeping \
                  reservations, seat capacity and payment provider state \
                  consistent.\n\n\
                  Default config: ~/.config/vistamar-booking/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "VISTAMAR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Run on in-memory storage (development only; nothing is persisted).
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(vistamar_booking::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Init tracing first so subsequent logs are formatted properly
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            // Fallback tracing init
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            error!("Using default configuration.");
            AppConfig::default()
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
        config.logging.level = level.clone();
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!(
            "   API address : {}:{}",
            config.server.api_host, config.server.api_port
        );
        println!("   Database    : {}", config.database.connection_url());
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        in_memory: cli.memory,
    })
    .await?;

    // Install OS signal handlers (SIGTERM, SIGINT)
    handle.install_signal_handler();

    info!("Press Ctrl+C to shutdown gracefully.");

    // Wait for shutdown signal, then clean up
    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
