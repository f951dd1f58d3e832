//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend with an HTTP GET
//! - Update backend liveness based on results

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, Cluster};

pub struct HealthChecker {
    cluster: Arc<Cluster>,
    interval: Duration,
    timeout: Duration,
    path: String,
    client: Client<HttpConnector, Body>,
}

impl HealthChecker {
    pub fn new(cluster: Arc<Cluster>, config: &HealthCheckConfig) -> Self {
        Self::with_timings(cluster, config.interval(), config.timeout(), &config.path)
    }

    pub fn with_timings(cluster: Arc<Cluster>, interval: Duration, timeout: Duration, path: &str) -> Self {
        // Fresh connection per probe; a pooled socket says nothing about reachability.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            cluster,
            interval,
            timeout,
            path,
            client,
        }
    }

    /// Run the periodic loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Sweep the cluster once per interval, forever. The first sweep
    /// happens one interval after start.
    pub async fn run(self) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            path = %self.path,
            "Health checker starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tracing::info!("Start cluster health check");
            self.check_all().await;
            tracing::info!("Finished cluster health check");
        }
    }

    /// Probe every backend in order and record the result.
    pub async fn check_all(&self) {
        for backend in self.cluster.backends() {
            let alive = self.probe(backend).await;
            let was_alive = backend.set_alive(alive);

            if was_alive != alive {
                tracing::info!(backend = %backend.address(), alive, "Backend liveness changed");
            } else {
                tracing::debug!(backend = %backend.address(), alive, "Backend status");
            }
        }
    }

    /// Probe one backend. Any completed response counts as alive.
    pub async fn probe(&self, backend: &Backend) -> bool {
        let uri = format!("http://{}{}", backend.address(), self.path);

        let request = match Request::builder()
            .method("GET")
            .uri(&uri)
            .header("user-agent", "rr-balancer-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                tracing::debug!(backend = %backend.address(), status = %response.status(), "Server reachable");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = %backend.address(), error = %e, "Server unreachable");
                false
            }
            Err(_) => {
                tracing::warn!(backend = %backend.address(), timeout = ?self.timeout, "Server unreachable: probe timed out");
                false
            }
        }
    }
}
