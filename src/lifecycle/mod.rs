//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Config → handlers → RpcServer (bind, init) → ObservabilitySystem
//!     → spawn both accept loops
//!
//! Shutdown (orchestrator.rs, shutdown.rs):
//!     Signal / Shutdown::trigger / component failure
//!     → stop accepting → drain within deadline → force-close → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//!
//! Run groups (run_group.rs):
//!     first error cancels siblings, wait joins all
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then handlers, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced close after deadline

pub mod orchestrator;
pub mod run_group;
pub mod shutdown;
pub mod signals;

pub use orchestrator::{App, AppError};
pub use run_group::RunGroup;
pub use shutdown::Shutdown;
