//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each backend (GET, bounded by timeout)
//!     → Backend::set_alive
//!
//! Passive condemnation (resilience/retries.rs):
//!     Retry budget exhausted on a backend
//!     → Backend::set_alive(false)
//! ```
//!
//! # Design Decisions
//! - A single sequential sweep per tick; each probe carries its own deadline
//! - Any completed response means alive, whatever the status code
//! - A failed probe flips only that backend and never stops the loop

pub mod active;

pub use active::HealthChecker;
