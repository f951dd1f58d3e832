//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forward to backend fails (transport error):
//!     → retries.rs (retry same backend after backoff, or condemn it)
//!     → dispatcher re-selects with attempts + 1
//!     → attempts exhausted: 503 for this request only
//! ```
//!
//! # Design Decisions
//! - Counters live with the request, never in shared state
//! - Application errors (any HTTP status) are not retried
//! - Exhaustion ends one request, never the process

pub mod retries;

pub use retries::{Failover, RequestState, RetryPolicy};
