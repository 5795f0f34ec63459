//! Typed method registration.
//!
//! A [`HandlerSet`] exposes a fixed capability set as a [`MethodSet`]: one
//! named entry per remote call. Each entry decodes `params` into its input
//! type, runs the handler, and encodes the output.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::observability::request_log::RequestFields;
use crate::rpc::error::RpcError;

/// Future returned by a type-erased method.
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;

/// Type-erased method: raw params in, raw result out.
pub type BoxedMethod = Arc<dyn Fn(Value, RequestFields) -> MethodFuture + Send + Sync>;

/// Implemented by handler types that expose remote calls.
///
/// Methods must be safe to invoke concurrently.
pub trait HandlerSet: Send + Sync + 'static {
    fn method_set(self: Arc<Self>) -> MethodSet;
}

/// Ordered list of named methods awaiting registration.
#[derive(Default, Clone)]
pub struct MethodSet {
    methods: Vec<(String, BoxedMethod)>,
}

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method taking `P` and returning `R`.
    pub fn method<P, R, F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P, RequestFields) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let boxed: BoxedMethod = Arc::new(move |params: Value, fields: RequestFields| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let params: P = serde_json::from_value(params).map_err(RpcError::invalid_params)?;
                let output = handler(params, fields).await?;
                serde_json::to_value(output).map_err(RpcError::internal)
            }) as MethodFuture
        });
        self.methods.push((name.into(), boxed));
        self
    }

    /// Append all methods of `other`. Collisions surface at registration.
    pub fn merge(mut self, other: MethodSet) -> Self {
        self.methods.extend(other.methods);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, BoxedMethod)> {
        self.methods
    }
}

impl std::fmt::Debug for MethodSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
