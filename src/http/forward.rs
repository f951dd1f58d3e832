//! Forwarding capability.
//!
//! # Responsibilities
//! - Snapshot an inbound request so it can be replayed on retry
//! - Rewrite it for a specific backend (scheme, authority, hop-by-hop headers)
//! - Send it upstream and hand the streamed response back
//!
//! # Design Decisions
//! - Only transport errors are failures; a 5xx from the backend is a response
//! - One `hyper-util` client is shared by every backend
//! - The inbound `Host` header is forwarded unchanged

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{
    header,
    uri::{Authority, Scheme},
    HeaderMap, HeaderName, HeaderValue, Method, Request, Response, Uri,
};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// HTTP client shared by all forwarders.
pub type ForwardClient = Client<HttpConnector, Body>;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that apply to a single connection and must not be forwarded.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Errors produced while forwarding a request to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend could not be reached or dropped the exchange.
    #[error("backend {address} unreachable: {source}")]
    Transport {
        address: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The inbound request could not be rewritten for the backend.
    #[error("cannot build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

impl ForwardError {
    pub fn transport(
        address: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ForwardError::Transport {
            address: address.into(),
            source: source.into(),
        }
    }

    /// True when retrying (or re-routing) could succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, ForwardError::Transport { .. })
    }
}

/// A buffered, replayable copy of an inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<SocketAddr>,
}

impl ProxyRequest {
    /// Buffer the body of `request`, refusing bodies over `limit` bytes.
    pub async fn buffer(
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
        limit: usize,
    ) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit).await?;
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            client_addr,
        })
    }

    /// Build a request without a body (tests, probes).
    pub fn new(method: Method, path_and_query: &str) -> Result<Self, axum::http::Error> {
        Ok(Self {
            method,
            uri: Uri::builder().path_and_query(path_and_query).build()?,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_addr: None,
        })
    }

    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    /// Rewrite this request to target `authority`.
    pub fn to_upstream(&self, authority: &Authority) -> Result<Request<Body>, axum::http::Error> {
        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority.clone())
            .path_and_query(self.path_and_query())
            .build()?;

        let mut builder = Request::builder().method(self.method.clone()).uri(uri);

        if let Some(headers) = builder.headers_mut() {
            let listed = connection_listed(&self.headers);
            for (name, value) in self.headers.iter() {
                if is_hop_by_hop(name) || listed.contains(name) {
                    continue;
                }
                headers.append(name.clone(), value.clone());
            }
            if let Some(addr) = self.client_addr {
                append_forwarded_for(headers, addr.ip());
            }
        }

        builder.body(Body::from(self.body.clone()))
    }
}

/// Extra hop-by-hop headers named in the `Connection` header.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

/// Remove hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed = connection_listed(headers);
    let doomed: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_hop_by_hop(name))
        .cloned()
        .chain(listed)
        .collect();
    for name in doomed {
        headers.remove(&name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Something that can deliver a request to one backend.
pub trait Forwarder: Send + Sync + fmt::Debug {
    fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>>;
}

/// Build the shared upstream client.
pub fn build_client(connect_timeout: Duration) -> ForwardClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Forwards over HTTP/1.1 to a fixed backend address.
#[derive(Clone)]
pub struct HttpForwarder {
    client: ForwardClient,
    authority: Authority,
}

impl HttpForwarder {
    pub fn new(client: ForwardClient, authority: Authority) -> Self {
        Self { client, authority }
    }
}

impl fmt::Debug for HttpForwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpForwarder")
            .field("authority", &self.authority)
            .finish()
    }
}

impl Forwarder for HttpForwarder {
    fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            let upstream = request.to_upstream(&self.authority)?;
            let response: Response<hyper::body::Incoming> = self
                .client
                .request(upstream)
                .await
                .map_err(|e| ForwardError::transport(self.authority.as_str(), e))?;
            let mut response = response.map(Body::new);
            strip_hop_by_hop(response.headers_mut());
            Ok(response)
        })
    }
}
