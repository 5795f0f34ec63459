use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const RPC_PATH: &str = "/jsonrpc/v2";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: i32,
    message: String,
}

/// A decoded reply envelope plus the request ID the service assigned.
#[derive(Debug, Clone)]
pub struct RpcReply {
    pub envelope: Value,
    pub request_id: Option<String>,
}

impl RpcReply {
    pub fn result(&self) -> Option<&Value> {
        self.envelope.get("result")
    }

    pub fn error_code(&self) -> Option<i64> {
        self.envelope.get("error")?.get("code")?.as_i64()
    }

    pub fn id(&self) -> &Value {
        self.envelope.get("id").unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
}

pub struct RpcClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Client for the service at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().no_proxy().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), RPC_PATH),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a call and return the raw reply envelope.
    pub async fn call_raw(&self, method: &str, params: Value) -> Result<RpcReply, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "method": method, "params": params, "id": id });
        self.send(body.to_string()).await
    }

    /// Send an arbitrary body, for exercising malformed requests.
    pub async fn send(&self, body: String) -> Result<RpcReply, ClientError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status { status, body: text });
        }

        Ok(RpcReply {
            envelope: serde_json::from_str(&text)?,
            request_id,
        })
    }

    /// Typed call: encodes `params`, decodes `result` or surfaces the error.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, ClientError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let reply = self.call_raw(method, serde_json::to_value(params)?).await?;

        if let Some(error) = reply.envelope.get("error") {
            let error: WireError = serde_json::from_value(error.clone())?;
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = reply.result().cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(result)?)
    }

    pub async fn echo(&self, message: &str) -> Result<EchoResponse, ClientError> {
        self.call("Echo", &json!({ "message": message })).await
    }
}
