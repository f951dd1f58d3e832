//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request dispatched
//!     → cluster.rs (ordered backend pool)
//!     → round_robin.rs (rotate through backends, skip dead ones)
//!     → backend.rs (forward through the backend's capability)
//!     → Return response or transport error
//! ```
//!
//! # Design Decisions
//! - One cluster instance, built at startup and shared via Arc
//! - Dead backends excluded from selection
//! - Liveness is per-backend; the cursor is the only pool-wide mutable state

pub mod backend;
pub mod cluster;
pub mod round_robin;

pub use backend::Backend;
pub use cluster::{Cluster, ClusterError};
