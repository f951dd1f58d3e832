//! Retry and failover logic.
//!
//! # Responsibilities
//! - Carry the per-request `attempts`/`retries` counters
//! - Decide, after a transport failure, between retrying the same backend
//!   and condemning it so the request is re-routed
//! - Bound the number of distinct backends tried per request
//!
//! # Design Decisions
//! - Two budgets: `max_retries` per backend, `max_attempts` per request
//! - Fixed short backoff between same-backend retries
//! - Condemnation is the only durable side effect; a health check can undo it

use std::time::Duration;

use crate::config::RetryConfig;
use crate::load_balancer::Backend;

/// Request-scoped counters. A fresh value is created per inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestState {
    /// Distinct backends tried so far, counting the current one.
    pub attempts: u32,
    /// Same-backend retries within the current attempt.
    pub retries: u32,
}

impl Default for RequestState {
    fn default() -> Self {
        Self {
            attempts: 1,
            retries: 0,
        }
    }
}

/// What to do after a forward attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failover {
    /// Wait `delay`, then try the same backend again.
    Retry { delay: Duration },
    /// The backend was condemned; pick another one.
    Reroute,
}

/// Retry/failover budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// True once the request has used up every attempt slot.
    pub fn attempts_exhausted(&self, state: &RequestState) -> bool {
        state.attempts > self.max_attempts
    }

    /// Advance `state` after a transport failure against `backend`.
    ///
    /// While retries remain the backend is kept. Otherwise it is marked dead,
    /// `attempts` goes up by one and `retries` starts over for the next backend.
    pub fn on_transport_failure(&self, state: &mut RequestState, backend: &Backend) -> Failover {
        if state.retries < self.max_retries {
            state.retries += 1;
            tracing::debug!(
                backend = %backend.address(),
                retry = state.retries,
                delay = ?self.backoff,
                "Retrying same backend"
            );
            return Failover::Retry { delay: self.backoff };
        }

        backend.set_alive(false);
        tracing::warn!(
            backend = %backend.address(),
            retries = state.retries,
            "Retry budget exhausted, marking backend down"
        );

        state.attempts += 1;
        state.retries = 0;
        tracing::info!(attempt = state.attempts, "Re-routing request to another backend");
        Failover::Reroute
    }
}
