//! Backend cluster management.
//!
//! # Responsibilities
//! - Own the ordered backend pool built from configuration
//! - Apply round-robin-skip-dead selection
//! - Expose members to the health checker and failover logic

use std::sync::Arc;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::http::forward::{ForwardClient, HttpForwarder};
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};

/// Errors raised while building a cluster at startup.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("backend pool is empty")]
    EmptyPool,

    #[error("invalid backend address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// The managed pool of backends plus the shared rotation state.
#[derive(Debug, Default)]
pub struct Cluster {
    /// Members in configuration order. Fixed once serving starts.
    members: Vec<Arc<Backend>>,
    rotation: RoundRobin,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cluster with one HTTP-forwarding backend per server entry.
    pub fn from_servers(servers: &[ServerConfig], client: &ForwardClient) -> Result<Self, ClusterError> {
        if servers.is_empty() {
            return Err(ClusterError::EmptyPool);
        }

        let mut cluster = Self::new();
        for server in servers {
            let address = server.authority();
            let invalid = |reason: String| ClusterError::InvalidAddress {
                address: address.clone(),
                reason,
            };

            let authority: Authority = address.parse().map_err(|e| invalid(format!("{}", e)))?;
            let forwarder = Arc::new(HttpForwarder::new(client.clone(), authority.clone()));
            let backend = Backend::new(authority, forwarder).map_err(|e| invalid(e.to_string()))?;

            tracing::info!(
                host = %server.host,
                port = server.port,
                weight = server.weight,
                "Configured backend server"
            );
            cluster.add_backend(Arc::new(backend));
        }
        Ok(cluster)
    }

    /// Append a member. Startup only: requires exclusive access.
    pub fn add_backend(&mut self, backend: Arc<Backend>) {
        self.members.push(backend);
    }

    /// Bump the shared cursor and return the rotation start point.
    pub fn next_index(&self) -> usize {
        self.rotation.next_index(self.members.len())
    }

    /// Next alive backend in rotation order, or `None` when all are dead.
    pub fn get_next_server(&self) -> Option<Arc<Backend>> {
        let selected = self.rotation.next_alive(&self.members);
        if selected.is_none() {
            tracing::debug!(backend_count = self.members.len(), "No alive backends in cluster");
        }
        selected
    }

    /// Set liveness of the member at `address`. Returns false if none matched.
    pub fn mark_backend_status(&self, address: &str, alive: bool) -> bool {
        match self.members.iter().find(|b| b.address() == address) {
            Some(backend) => {
                backend.set_alive(alive);
                true
            }
            None => false,
        }
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::forward::{build_client, testing::backend};
    use std::collections::HashMap;
    use std::thread;
    use std::time::Duration;

    fn cluster_abc() -> Cluster {
        let mut cluster = Cluster::new();
        cluster.add_backend(backend("a:80"));
        cluster.add_backend(backend("b:80"));
        cluster.add_backend(backend("c:80"));
        cluster
    }

    fn pick(cluster: &Cluster) -> String {
        cluster.get_next_server().unwrap().address().to_string()
    }

    #[test]
    fn test_all_alive_rotation() {
        let cluster = cluster_abc();
        assert_eq!(pick(&cluster), "a:80");
        assert_eq!(pick(&cluster), "b:80");
        assert_eq!(pick(&cluster), "c:80");
    }

    #[test]
    fn test_dead_member_skipped() {
        let cluster = cluster_abc();
        for _ in 0..3 {
            pick(&cluster);
        }

        assert!(cluster.mark_backend_status("b:80", false));
        let picks: Vec<_> = (0..3).map(|_| pick(&cluster)).collect();
        assert_eq!(picks, vec!["a:80", "c:80", "a:80"]);

        for _ in 0..20 {
            assert_ne!(pick(&cluster), "b:80");
        }
    }

    #[test]
    fn test_all_dead_returns_none() {
        let cluster = cluster_abc();
        for b in cluster.backends() {
            b.set_alive(false);
        }
        assert!(cluster.get_next_server().is_none());

        // a resurrected member is selectable again right away
        cluster.backends()[2].set_alive(true);
        assert_eq!(pick(&cluster), "c:80");
    }

    #[test]
    fn test_mark_unknown_address() {
        let cluster = cluster_abc();
        assert!(!cluster.mark_backend_status("d:80", false));
        assert!(cluster.backends().iter().all(|b| b.is_alive()));
    }

    #[test]
    fn test_next_index_wraps_modulo_len() {
        let cluster = cluster_abc();
        let indices: Vec<_> = (0..6).map(|_| cluster.next_index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_from_servers() {
        let servers = vec![
            ServerConfig { host: "localhost".into(), port: 8081, weight: 1 },
            ServerConfig { host: "localhost".into(), port: 8082, weight: 5 },
        ];
        let cluster = Cluster::from_servers(&servers, &build_client(Duration::from_secs(1))).unwrap();
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster.backends()[1].address(), "localhost:8082");

        let err = Cluster::from_servers(&[], &build_client(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, ClusterError::EmptyPool));

        let bad = vec![ServerConfig { host: "bad host".into(), port: 80, weight: 1 }];
        let err = Cluster::from_servers(&bad, &build_client(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidAddress { .. }));
    }

    #[test]
    fn test_concurrent_selection_never_returns_dead() {
        let cluster = Arc::new(cluster_abc());
        cluster.mark_backend_status("b:80", false);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cluster = cluster.clone();
                thread::spawn(move || {
                    let mut counts: HashMap<String, usize> = HashMap::new();
                    for _ in 0..1000 {
                        *counts.entry(pick(&cluster)).or_default() += 1;
                    }
                    counts
                })
            })
            .collect();

        let mut totals: HashMap<String, usize> = HashMap::new();
        for h in handles {
            for (addr, n) in h.join().unwrap() {
                *totals.entry(addr).or_default() += n;
            }
        }

        assert!(!totals.contains_key("b:80"));
        assert_eq!(totals.values().sum::<usize>(), 8000);
        // fairness is best effort under contention, but both survivors get traffic
        assert!(totals["a:80"] > 0 && totals["c:80"] > 0);
    }
}
