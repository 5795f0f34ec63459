//! Remote call handlers exposed by the service.
//!
//! Each handler type implements [`HandlerSet`](crate::rpc::HandlerSet) and
//! is registered by the orchestrator under the empty namespace.

pub mod echo;

pub use echo::{EchoHandler, EchoParams, EchoResponse};
