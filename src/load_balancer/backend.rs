//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track liveness (alive/dead) under a read-write lock
//! - Forward requests through the capability bound to its address

use std::sync::Arc;

use axum::body::Body;
use axum::http::{uri::Authority, Response};
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use url::Url;

use crate::http::forward::{ForwardError, Forwarder, ProxyRequest};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// `host:port` of the backend. Immutable.
    address: Authority,
    /// Pre-calculated base URL, used by health probes and logs.
    base_url: Url,
    /// Believed liveness. Starts `true`.
    alive: RwLock<bool>,
    forwarder: Arc<dyn Forwarder>,
}

impl Backend {
    /// Create a new backend, alive until proven otherwise.
    pub fn new(address: Authority, forwarder: Arc<dyn Forwarder>) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!("http://{}/", address))?;
        Ok(Self {
            address,
            base_url,
            alive: RwLock::new(true),
            forwarder,
        })
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Snapshot of the current liveness.
    pub fn is_alive(&self) -> bool {
        *self.alive.read()
    }

    /// Replace liveness, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        std::mem::replace(&mut *self.alive.write(), alive)
    }

    /// Deliver `request` to this backend.
    ///
    /// Transport failures come back as `Err` so the caller can decide
    /// between retrying here and re-routing elsewhere.
    pub fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
        self.forwarder.forward(request)
    }
}
