//! Wire envelopes.
//!
//! Request: `{"method": string, "params": any, "id": number|string}`.
//! Response: `{"result": any, "id": ...}` or
//! `{"error": {"code": int, "message": string}, "id": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rpc::error::RpcError;

/// Correlation id, echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Id {
    Number(serde_json::Number),
    Str(String),
    #[default]
    Null,
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Number(value.into())
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

impl Id {
    /// Best-effort id extraction from a payload that failed envelope decoding.
    pub fn from_raw(value: &Value) -> Self {
        match value.get("id") {
            Some(Value::Number(n)) => Id::Number(n.clone()),
            Some(Value::String(s)) => Id::Str(s.clone()),
            _ => Id::Null,
        }
    }
}

/// Incoming call envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Accepted for JSON-RPC 2.0 clients, otherwise ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,

    pub method: String,

    #[serde(default)]
    pub params: Value,

    #[serde(default)]
    pub id: Id,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: impl Into<Id>) -> Self {
        Self {
            jsonrpc: None,
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// Result or error half of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// Outgoing reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(flatten)]
    pub outcome: Outcome,

    pub id: Id,
}

impl RpcResponse {
    pub fn result(result: Value, id: Id) -> Self {
        Self {
            outcome: Outcome::Result(result),
            id,
        }
    }

    pub fn error(error: RpcError, id: Id) -> Self {
        Self {
            outcome: Outcome::Error(error),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Error code, or 0 for a successful call.
    pub fn code(&self) -> i32 {
        match &self.outcome {
            Outcome::Result(_) => 0,
            Outcome::Error(e) => e.code,
        }
    }
}
