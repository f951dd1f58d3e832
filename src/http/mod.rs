//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → request.rs (request ID)
//!     → forward.rs (buffer body into a replayable ProxyRequest)
//!     → dispatcher.rs (select backend, retry, re-route, or 503)
//!     → forward.rs (rewrite and send to backend)
//!     → Stream backend response to client
//! ```

pub mod dispatcher;
pub mod forward;
pub mod request;
pub mod server;

pub use dispatcher::{DispatchError, Dispatcher};
pub use forward::{ForwardError, Forwarder, HttpForwarder, ProxyRequest};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
