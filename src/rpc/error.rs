//! RPC error types.
//!
//! [`RpcError`] is the per-request error returned to the caller inside the
//! response envelope. [`DispatchError`] is a registration-time failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes (JSON-RPC 2.0 numbering).
pub mod codes {
    /// Body is not valid JSON.
    pub const PARSE_ERROR: i32 = -32700;
    /// JSON, but not a call envelope.
    pub const INVALID_REQUEST: i32 = -32600;
    /// No method registered under the requested name.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Params do not decode into the method's input.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Result could not be encoded.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Handler reported a failure.
    pub const SERVER_ERROR: i32 = -32000;
}

/// Error object carried in a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("parse error: {}", detail))
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("invalid request: {}", detail))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("method not found: {}", method))
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("invalid params: {}", detail))
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("internal error: {}", detail))
    }

    /// Handler-level failure; the message is passed through verbatim.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(codes::SERVER_ERROR, message)
    }
}

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("duplicate method: {0}")]
    DuplicateMethod(String),
}
