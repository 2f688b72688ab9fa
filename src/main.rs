//! Token faucet backend.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/fund
//!     ──────────────▶ http (auth, body) ──▶ security::rate_limit ──▶ store (redis)
//!                                      │
//!                                      └──▶ blockchain::Submitter ──▶ ledger RPC
//!                                                 │
//!                          resilience::backoff ◀──┘  (every remote call)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use eth_faucet::config::load_config;
use eth_faucet::http::HttpServer;
use eth_faucet::lifecycle::signals::spawn_signal_handler;
use eth_faucet::lifecycle::startup::build_state;
use eth_faucet::lifecycle::Shutdown;
use eth_faucet::observability::logging::{init_logging, LogFormat};
use eth_faucet::observability::metrics::init_metrics;

#[derive(Parser)]
#[command(name = "faucet", version)]
#[command(about = "Token faucet backend", long_about = None)]
struct Cli {
    /// Log level (overrides the config file)
    #[arg(long, global = true, env = "FAUCET_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (overrides the config file)
    #[arg(long, global = true, value_enum, env = "FAUCET_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the faucet server
    Serve {
        /// Path to the TOML config file
        #[arg(short, long, env = "FAUCET_CONFIG", default_value = "faucet.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let config = load_config(&config)?;

            let level = cli.log_level.unwrap_or_else(|| config.observability.log_level.clone());
            let format = cli.log_format.unwrap_or(config.observability.log_format);
            init_logging(&level, format)?;

            tracing::info!(version = env!("CARGO_PKG_VERSION"), "faucet starting");

            if config.observability.metrics_enabled {
                let addr: SocketAddr = config.observability.metrics_address.parse()?;
                init_metrics(addr)?;
            }

            let shutdown = Shutdown::new();
            spawn_signal_handler(shutdown.clone());

            let listen_address = config.server.listen_address.clone();
            let state = build_state(config, shutdown).await?;

            let listener = TcpListener::bind(&listen_address).await?;
            tracing::info!(
                address = %listener.local_addr()?,
                faucet_address = %state.submitter.address(),
                "Starting up faucet server..."
            );

            HttpServer::new(state).run(listener).await?;
            tracing::info!("Server is down");
        }
    }

    Ok(())
}
