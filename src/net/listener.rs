//! TCP listener binding.
//!
//! # Responsibilities
//! - Normalize configured addresses (`":port"` shorthand)
//! - Bind the TCP listener and report the local address
//! - Distinguish bind failures from accept failures

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::parse_bind_address;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address could not be parsed.
    #[error("Invalid bind address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
}

/// Bind a TCP listener to the configured address.
///
/// Binding happens before any task is spawned so an occupied port fails
/// startup immediately.
pub async fn bind(address: &str) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let addr = parse_bind_address(address).map_err(|source| ListenerError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");

    Ok((listener, local_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let (_listener, addr) = bind("127.0.0.1:0").await.unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn second_bind_on_same_address_fails() {
        let (_listener, addr) = bind("127.0.0.1:0").await.unwrap();
        let err = bind(&addr.to_string()).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn rejects_garbage_address() {
        let err = bind("nowhere").await.unwrap_err();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }
}
