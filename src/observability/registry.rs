//! Named metric collectors.
//!
//! # Responsibilities
//! - Hold the append-only set of collectors refreshed on every scrape
//! - Reject duplicate collector names
//! - Freeze registration once the system starts serving
//!
//! # Data Flow
//! ```text
//! GET /metrics
//!     → MetricsRegistry::collect_into(recorder)
//!         → each Collector::collect() (gauges via `metrics` macros)
//!     → PrometheusHandle::render()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use metrics::Recorder;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("collector already registered: {0}")]
    DuplicateCollector(String),

    #[error("registry is frozen, cannot register collector: {0}")]
    Frozen(String),
}

/// A source of point-in-time measurements, refreshed on every scrape.
///
/// `collect` records through the `metrics` macros; the registry routes those
/// calls to the recorder being scraped.
pub trait Collector: Send + Sync + 'static {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    fn collect(&self);
}

#[derive(Default)]
pub struct MetricsRegistry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
    frozen: AtomicBool,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        let name = collector.name().to_string();
        if self.frozen.load(Ordering::Acquire) {
            return Err(RegistryError::Frozen(name));
        }

        let mut collectors = self.collectors.write().unwrap_or_else(|e| e.into_inner());
        if collectors.iter().any(|c| c.name() == name) {
            return Err(RegistryError::DuplicateCollector(name));
        }
        collectors.push(collector);

        tracing::debug!(collector = %name, "Collector registered");
        Ok(())
    }

    /// Reject further registrations.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Collector names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.collectors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Refresh every collector into `recorder`.
    pub fn collect_into(&self, recorder: &dyn Recorder) {
        let collectors = self.collectors.read().unwrap_or_else(|e| e.into_inner()).clone();
        metrics::with_local_recorder(recorder, || {
            for collector in &collectors {
                collector.collect();
            }
        });
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("collectors", &self.names())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
