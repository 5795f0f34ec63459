//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bind address of the observability sidecar.
pub const DEFAULT_OBSERVABILITY_ADDRESS: &str = "0.0.0.0:53000";

/// Root configuration for the RPC service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// RPC listener settings.
    pub server: ServerConfig,

    /// Observability sidecar and logging settings.
    pub observability: ObservabilityConfig,

    /// Process shutdown settings.
    pub shutdown: ShutdownConfig,
}

/// RPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). `":8080"` is accepted as well.
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Start the metrics/profiler sidecar.
    pub enabled: bool,

    /// Sidecar bind address. Empty means [`DEFAULT_OBSERVABILITY_ADDRESS`].
    pub bind_address: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Drain deadline for the sidecar listener, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl ObservabilityConfig {
    /// Address the sidecar binds, with an empty value falling back to
    /// [`DEFAULT_OBSERVABILITY_ADDRESS`].
    pub fn effective_bind_address(&self) -> &str {
        if self.bind_address.is_empty() {
            DEFAULT_OBSERVABILITY_ADDRESS
        } else {
            &self.bind_address
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: DEFAULT_OBSERVABILITY_ADDRESS.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Process shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Deadline for draining in-flight RPC requests, in seconds.
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.observability.bind_address, DEFAULT_OBSERVABILITY_ADDRESS);
        assert_eq!(config.shutdown.timeout(), Duration::from_secs(10));
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [server]
            bind_address = "127.0.0.1:9000"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(config.observability.enabled);
    }

    #[test]
    fn empty_observability_address_uses_default() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [observability]
            bind_address = ""
            "#,
        )
        .unwrap();

        assert_eq!(config.observability.effective_bind_address(), DEFAULT_OBSERVABILITY_ADDRESS);
    }
}
