//! Dummy backends for trying the balancer by hand.
//!
//! Starts one listener per configured server; each answers every request
//! with `I came from <host:port>`.

use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use futures_util::future::join_all;

use rr_balancer::config::load_config;
use rr_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "backend-server")]
#[command(about = "Dummy HTTP backends for the load balancer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config/balancer.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init(&config.observability.log_level);

    let tasks = config.servers.iter().map(|server| {
        let address = server.authority();
        tokio::spawn(async move {
            let reply = format!("I came from {}", address);
            let app = Router::new().fallback(move || {
                let reply = reply.clone();
                async move { reply }
            });

            match tokio::net::TcpListener::bind(&address).await {
                Ok(listener) => {
                    tracing::info!(address = %address, "Started server");
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::error!(address = %address, error = %e, "Server stopped");
                    }
                }
                Err(e) => tracing::error!(address = %address, error = %e, "Unable to start server"),
            }
        })
    });

    join_all(tasks).await;
    Ok(())
}
