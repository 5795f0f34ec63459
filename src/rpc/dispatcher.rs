//! Method routing.
//!
//! # Responsibilities
//! - Hold the bound method table (empty namespace, exact-name lookup)
//! - Decode raw envelopes and route by method name
//! - Turn every failure into a structured response envelope
//!
//! # Design Decisions
//! - Registration is all-or-nothing: names are checked before any insert
//! - No locking: the table is immutable once the server is initialized

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::observability::metrics;
use crate::observability::request_log::RequestFields;
use crate::rpc::envelope::{Id, RpcRequest, RpcResponse};
use crate::rpc::error::{DispatchError, RpcError};
use crate::rpc::method::{BoxedMethod, HandlerSet, MethodSet};

/// Metrics label used for calls that name no registered method.
const UNKNOWN_METHOD_LABEL: &str = "unknown";

/// Routes decoded envelopes to registered methods.
#[derive(Default)]
pub struct Dispatcher {
    methods: HashMap<String, BoxedMethod>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every method exposed by `handlers`.
    pub fn register_handler_set<H: HandlerSet>(&mut self, handlers: Arc<H>) -> Result<(), DispatchError> {
        self.register_methods(handlers.method_set())
    }

    /// Bind a method set. On collision nothing from `set` is bound.
    pub fn register_methods(&mut self, set: MethodSet) -> Result<(), DispatchError> {
        let mut incoming = HashSet::new();
        for name in set.names() {
            if self.methods.contains_key(name) || !incoming.insert(name) {
                return Err(DispatchError::DuplicateMethod(name.to_string()));
            }
        }

        for (name, method) in set.into_entries() {
            tracing::debug!(method = %name, "RPC method registered");
            self.methods.insert(name, method);
        }
        Ok(())
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Decode a raw body and dispatch it.
    pub async fn dispatch(&self, raw: &[u8], fields: RequestFields) -> RpcResponse {
        let start = Instant::now();

        let value: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(e) => {
                fields.warn("malformed request body");
                let response = RpcResponse::error(RpcError::parse_error(e), Id::Null);
                metrics::record_rpc_request(UNKNOWN_METHOD_LABEL, response.code(), start);
                return response;
            }
        };

        let id = Id::from_raw(&value);
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                fields.warn("request is not a call envelope");
                let response = RpcResponse::error(RpcError::invalid_request(e), id);
                metrics::record_rpc_request(UNKNOWN_METHOD_LABEL, response.code(), start);
                return response;
            }
        };

        self.dispatch_request(request, fields).await
    }

    /// Dispatch an already decoded envelope.
    pub async fn dispatch_request(&self, request: RpcRequest, fields: RequestFields) -> RpcResponse {
        let start = Instant::now();
        let RpcRequest { method, params, id, .. } = request;

        let Some(handler) = self.methods.get(&method) else {
            fields.with_handler_name(method.as_str()).warn("method not found");
            let response = RpcResponse::error(RpcError::method_not_found(&method), id);
            metrics::record_rpc_request(UNKNOWN_METHOD_LABEL, response.code(), start);
            return response;
        };

        let fields = fields.with_handler_name(method.as_str());
        fields.debug("dispatching call");

        let response = match handler(params, fields.clone()).await {
            Ok(result) => RpcResponse::result(result, id),
            Err(e) => {
                fields
                    .with_message(e.message.as_str())
                    .error(&format!("call failed with code {}", e.code));
                RpcResponse::error(e, id)
            }
        };

        metrics::record_rpc_request(&method, response.code(), start);
        response
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.method_names())
            .finish()
    }
}
