//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http::server ──▶ http::dispatcher          │
//!                           │                        │                     │
//!                           │                        ▼                     │
//!                           │              load_balancer::cluster          │
//!                           │          (round-robin, skip dead backends)   │
//!                           │                        │                     │
//!                           │                        ▼                     │
//!     Client Response       │   http::forward ◀── backend ── retry/failover│
//!     ◀─────────────────────┼──                     ▲                      │──── Backends
//!                           │                       │ set_alive            │
//!                           │              health::active (periodic)       │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rr_balancer::config::load_config;
use rr_balancer::observability::logging;
use rr_balancer::HttpServer;

#[derive(Parser)]
#[command(name = "lb")]
#[command(about = "Round-robin HTTP load balancer", long_about = None)]
struct Cli {
    /// Backend configuration file (JSON or TOML).
    #[arg(short, long, default_value = "config/balancer.json")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Unable to load {}: {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);

    tracing::info!(
        config = %cli.config.display(),
        backends = config.servers.len(),
        health_interval_secs = config.health_check.interval_secs,
        max_retries = config.retries.max_retries,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    Ok(())
}
