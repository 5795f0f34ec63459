//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, RPC route)
//!     → request.rs (request ID, trace ID → request log fields)
//!     → rpc::Dispatcher (decode, route, encode)
//!     → JSON response, x-request-id echoed
//! ```
//!
//! graceful.rs owns drain/force-close for both the RPC listener and the
//! observability listener.

pub mod graceful;
pub mod request;
pub mod server;

pub use graceful::{DrainTimeout, GracefulServe};
pub use request::{request_fields, X_REQUEST_ID};
pub use server::{RpcServer, ServerError, ServerState, RPC_PATH};
