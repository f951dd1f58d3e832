//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the cluster and dispatcher from configuration
//! - Create the Axum Router with the single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Spawn the health checker and serve on the given listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::BalancerConfig;
use crate::health::HealthChecker;
use crate::http::dispatcher::Dispatcher;
use crate::http::forward::{build_client, ProxyRequest};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::load_balancer::{Cluster, ClusterError};
use crate::resilience::RetryPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_size: usize,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    cluster: Arc<Cluster>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BalancerConfig) -> Result<Self, ClusterError> {
        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
        let cluster = Arc::new(Cluster::from_servers(&config.servers, &client)?);
        let dispatcher = Arc::new(Dispatcher::new(
            cluster.clone(),
            RetryPolicy::from_config(&config.retries),
        ));

        let state = AppState {
            dispatcher,
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            cluster,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.cluster.len(),
            "HTTP server starting"
        );

        let _health = if self.config.health_check.enabled {
            let checker = HealthChecker::new(self.cluster.clone(), &self.config.health_check);
            Some(AbortOnDrop(checker.spawn()))
        } else {
            tracing::info!("Active health checks disabled");
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Shared handle to the backend cluster.
    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }
}

/// Stops the health checker when the server future goes away.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Catch-all handler: buffer the request and hand it to the dispatcher.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let span = tracing::info_span!(
        "proxy",
        request_id = %request_id(&request),
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let request = match ProxyRequest::buffer(request, client_addr, state.max_body_size).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, limit = state.max_body_size, "Failed to buffer request body");
                return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
            }
        };

        match state.dispatcher.dispatch(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Request rejected");
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}
