//! Request dispatch.
//!
//! Drives one logical request through selection, forwarding, same-backend
//! retries and re-routing:
//!
//! ```text
//! DISPATCH ──(backend found)──▶ FORWARDING ──(ok)──▶ DONE
//!    ▲                             │
//!    │                             ├─(transport failure, retries left)─▶ BACKOFF ─▶ FORWARDING
//!    │                             │
//!    └──(attempts + 1)── CONDEMN ◀─┘ (retries exhausted)
//!
//! DISPATCH ──(attempts exhausted | no alive backend)──▶ REJECTED
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;
use tokio::time;

use crate::http::forward::{ForwardError, ProxyRequest};
use crate::load_balancer::{Backend, Cluster};
use crate::resilience::{Failover, RequestState, RetryPolicy};

/// Why a request was not served by any backend.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no healthy backend available")]
    NoHealthyBackend,

    #[error("max attempts reached after {attempts} backends failed")]
    AttemptsExhausted { attempts: u32 },

    #[error(transparent)]
    Upstream(ForwardError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> axum::response::Response {
        match self {
            DispatchError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response(),
            _ => (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response(),
        }
    }
}

/// Entry point for every inbound request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    cluster: Arc<Cluster>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(cluster: Arc<Cluster>, policy: RetryPolicy) -> Self {
        Self { cluster, policy }
    }

    /// Serve `request` from the first backend that answers.
    pub async fn dispatch(&self, request: &ProxyRequest) -> Result<Response<Body>, DispatchError> {
        let mut state = RequestState::default();

        loop {
            if self.policy.attempts_exhausted(&state) {
                let attempts = state.attempts - 1;
                tracing::warn!(
                    path = %request.path_and_query(),
                    attempts,
                    "Max attempts reached for request"
                );
                return Err(DispatchError::AttemptsExhausted { attempts });
            }

            let backend = match self.cluster.get_next_server() {
                Some(backend) => backend,
                None => {
                    tracing::warn!(path = %request.path_and_query(), "No healthy backend available");
                    return Err(DispatchError::NoHealthyBackend);
                }
            };

            tracing::debug!(backend = %backend.address(), attempt = state.attempts, "Forwarding request");

            if let Some(response) = self.forward_with_retries(&backend, request, &mut state).await? {
                return Ok(response);
            }
        }
    }

    /// Forward to one backend, retrying on transport failure.
    ///
    /// Returns `Ok(None)` once the backend has been condemned.
    async fn forward_with_retries(
        &self,
        backend: &Backend,
        request: &ProxyRequest,
        state: &mut RequestState,
    ) -> Result<Option<Response<Body>>, DispatchError> {
        loop {
            match backend.forward(request).await {
                Ok(response) => return Ok(Some(response)),
                Err(e) if !e.is_transport() => {
                    tracing::error!(backend = %backend.address(), error = %e, "Request cannot be forwarded");
                    return Err(DispatchError::Upstream(e));
                }
                Err(e) => {
                    tracing::warn!(
                        backend = %backend.address(),
                        retry = state.retries,
                        error = %e,
                        "Forward failed"
                    );
                    match self.policy.on_transport_failure(state, backend) {
                        Failover::Retry { delay } => time::sleep(delay).await,
                        Failover::Reroute => return Ok(None),
                    }
                }
            }
        }
    }
}
