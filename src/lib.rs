//! Round-robin HTTP load balancer library.

pub mod config;
pub mod health;
pub mod http;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::schema::BalancerConfig;
pub use http::HttpServer;
pub use load_balancer::Cluster;
