//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject an empty backend pool
//! - Validate value ranges (intervals > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backend servers configured")]
    NoServers,

    #[error("server #{index} has an empty host")]
    EmptyHost { index: usize },

    #[error("server #{index} ({host}) has port 0")]
    ZeroPort { index: usize, host: String },

    #[error("health_check.{field} must be greater than zero")]
    ZeroHealthSetting { field: &'static str },

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("timeouts.connect_secs must be greater than zero")]
    ZeroConnectTimeout,
}

pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    for (index, server) in config.servers.iter().enumerate() {
        if server.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost { index });
        }
        if server.port == 0 {
            errors.push(ValidationError::ZeroPort {
                index,
                host: server.host.clone(),
            });
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::ZeroHealthSetting { field: "interval_secs" });
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::ZeroHealthSetting { field: "timeout_secs" });
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn server(host: &str, port: u16) -> ServerConfig {
        ServerConfig {
            host: host.into(),
            port,
            weight: 1,
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = BalancerConfig::default();
        config.servers.push(server("localhost", 8081));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_pool_rejected() {
        let config = BalancerConfig::default();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoServers]));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = BalancerConfig::default();
        config.servers.push(server("", 8081));
        config.servers.push(server("localhost", 0));
        config.health_check.timeout_secs = 0;
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHost { index: 0 },
                ValidationError::ZeroPort { index: 1, host: "localhost".into() },
                ValidationError::ZeroHealthSetting { field: "timeout_secs" },
                ValidationError::ZeroAttempts,
            ]
        );
    }

    #[test]
    fn test_health_settings_ignored_when_disabled() {
        let mut config = BalancerConfig::default();
        config.servers.push(server("localhost", 8081));
        config.health_check.enabled = false;
        config.health_check.interval_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_connect_timeout_rejected() {
        let mut config = BalancerConfig::default();
        config.servers.push(server("localhost", 8081));
        config.timeouts.connect_secs = 0;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ZeroConnectTimeout])
        );
    }
}
