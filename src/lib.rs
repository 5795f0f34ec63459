//! RPC service runtime: a JSON RPC endpoint with an observability sidecar.

pub mod config;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rpc;

pub use config::schema::ServiceConfig;
pub use http::RpcServer;
pub use lifecycle::{App, Shutdown};
pub use observability::ObservabilitySystem;
