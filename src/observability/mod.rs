//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs / request_log.rs (structured log events)
//!     → metrics.rs (RPC counters, histograms, in-flight gauge)
//!     → tracing.rs (trace IDs from incoming headers)
//!
//! system.rs serves them:
//!     GET /              → status + endpoint directory
//!     GET /metrics       → registry.rs collectors → provider.rs render
//!     GET /debug/pprof/* → profiler.rs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID and trace ID flow through every request log line
//! - Metrics are cheap (atomic increments) and no-ops until a provider is
//!   installed
//! - Provider and propagator are installed once per process

pub mod collectors;
pub mod logging;
pub mod metrics;
pub mod profiler;
pub mod provider;
pub mod registry;
pub mod request_log;
pub mod system;
pub mod tracing;

pub use registry::{Collector, MetricsRegistry, RegistryError};
pub use request_log::RequestFields;
pub use system::{ObservabilityError, ObservabilitySystem};
