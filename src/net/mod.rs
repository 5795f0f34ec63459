//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (normalize, bind, fail fast)
//!     → Hand off to axum::serve (accept loop)
//!     → connection.rs (in-flight accounting per request)
//! ```
//!
//! # Design Decisions
//! - Listeners are bound at construction, before any task is spawned
//! - In-flight requests are counted so shutdown can report what it drains

pub mod connection;
pub mod listener;

pub use connection::{track_in_flight, InFlightTracker};
pub use listener::ListenerError;
