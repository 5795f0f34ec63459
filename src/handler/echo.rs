//! `Echo`: returns the given message prefixed with `"echo: "`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::observability::request_log::RequestFields;
use crate::rpc::{HandlerSet, MethodSet, RpcError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EchoParams {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EchoResponse {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EchoHandler;

impl EchoHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn echo(&self, params: EchoParams, fields: RequestFields) -> Result<EchoResponse, RpcError> {
        fields.with_msg_key("echo").with_message(params.message.as_str()).info("new call");
        Ok(EchoResponse {
            message: format!("echo: {}", params.message),
        })
    }
}

impl HandlerSet for EchoHandler {
    fn method_set(self: Arc<Self>) -> MethodSet {
        MethodSet::new().method("Echo", move |params: EchoParams, fields| {
            let handler = Arc::clone(&self);
            async move { handler.echo(params, fields).await }
        })
    }
}
