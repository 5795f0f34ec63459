//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect two listeners configured on the same address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),

    #[error("server and observability listeners share address {0}")]
    AddressConflict(SocketAddr),
}

/// Normalize a bind address, accepting the `":port"` shorthand.
pub fn parse_bind_address(value: &str) -> Result<SocketAddr, std::net::AddrParseError> {
    if let Some(port) = value.strip_prefix(':') {
        format!("0.0.0.0:{}", port).parse()
    } else {
        value.parse()
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server_addr = match parse_bind_address(&config.server.bind_address) {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field: "server.bind_address",
                value: config.server.bind_address.clone(),
            });
            None
        }
    };

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "server.request_timeout_secs" });
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroValue { field: "server.max_body_bytes" });
    }
    if config.shutdown.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "shutdown.timeout_secs" });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if config.observability.enabled {
        if config.observability.shutdown_timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "observability.shutdown_timeout_secs",
            });
        }

        let raw = config.observability.effective_bind_address();
        match parse_bind_address(raw) {
            Ok(obs_addr) => {
                // Port 0 asks the OS for a fresh port, so it never conflicts.
                if let Some(server_addr) = server_addr {
                    if obs_addr.port() != 0 && obs_addr == server_addr {
                        errors.push(ValidationError::AddressConflict(obs_addr));
                    }
                }
            }
            Err(_) => errors.push(ValidationError::InvalidAddress {
                field: "observability.bind_address",
                value: raw.to_string(),
            }),
        }
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

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn port_shorthand_binds_all_interfaces() {
        let addr = parse_bind_address(":53000").unwrap();
        assert_eq!(addr, "0.0.0.0:53000".parse().unwrap());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServiceConfig::default();
        config.server.bind_address = "not-an-address".into();
        config.shutdown.timeout_secs = 0;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroValue { field: "shutdown.timeout_secs" }));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
    }

    #[test]
    fn rejects_shared_listener_address() {
        let mut config = ServiceConfig::default();
        config.server.bind_address = "127.0.0.1:7000".into();
        config.observability.bind_address = "127.0.0.1:7000".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::AddressConflict("127.0.0.1:7000".parse().unwrap())]
        );
    }

    #[test]
    fn ephemeral_ports_never_conflict() {
        let mut config = ServiceConfig::default();
        config.server.bind_address = "127.0.0.1:0".into();
        config.observability.bind_address = "127.0.0.1:0".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn disabled_sidecar_skips_its_checks() {
        let mut config = ServiceConfig::default();
        config.observability.enabled = false;
        config.observability.bind_address = "garbage".into();
        assert!(validate_config(&config).is_ok());
    }
}
