//! RPC protocol subsystem.
//!
//! # Data Flow
//! ```text
//! POST /jsonrpc/v2 body
//!     → envelope.rs (decode {method, params, id})
//!     → dispatcher.rs (exact-name lookup)
//!     → method.rs (decode params, invoke handler, encode result)
//!     → envelope.rs (encode {result, id} | {error, id})
//! ```
//!
//! # Design Decisions
//! - Per-request failures are always answered with an error envelope
//! - All handler sets share one empty namespace; collisions fail registration

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod method;

pub use dispatcher::Dispatcher;
pub use envelope::{Id, Outcome, RpcRequest, RpcResponse};
pub use error::{codes, DispatchError, RpcError};
pub use method::{HandlerSet, MethodSet};
