//! Metrics provider and its process-scoped installation.
//!
//! # Responsibilities
//! - Build the Prometheus recorder with latency buckets
//! - Render the exposition text for `/metrics`
//! - Install the recorder as the `metrics` global, once per process
//!
//! # Design Decisions
//! - The recorder is shared behind an `Arc` so each system can always render
//!   its own measurements, installed or not
//! - First installation wins; later systems log and keep serving their own
//!   recorder, which only sees collector output

use std::sync::{Arc, OnceLock};

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

use crate::observability::metrics::{describe_rpc_metrics, DURATION_BUCKETS};

/// Outcome of the first installation attempt. `None` when another recorder
/// already held the `metrics` global.
static GLOBAL_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Prometheus recorder plus the handle used to render it.
#[derive(Clone)]
pub struct MetricsProvider {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl MetricsProvider {
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("_duration_seconds".to_string()),
                DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
        })
    }

    pub fn recorder(&self) -> &dyn Recorder {
        &*self.recorder
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.run_upkeep();
        self.handle.render()
    }

    /// Install this provider as the process-wide recorder.
    ///
    /// Returns `false` when an earlier installation already holds the slot.
    pub fn install_global(&self) -> bool {
        let mut attempted = false;
        let slot = GLOBAL_HANDLE.get_or_init(|| {
            attempted = true;
            match metrics::set_global_recorder(SharedRecorder(Arc::clone(&self.recorder))) {
                Ok(()) => {
                    describe_rpc_metrics();
                    tracing::debug!("Global metrics recorder installed");
                    Some(self.handle.clone())
                }
                Err(_) => {
                    tracing::warn!("A global metrics recorder was installed elsewhere");
                    None
                }
            }
        });

        let installed = attempted && slot.is_some();
        if !attempted && slot.is_some() {
            tracing::warn!("Metrics provider already installed for this process, keeping the first");
        }
        installed
    }
}

impl std::fmt::Debug for MetricsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsProvider").finish_non_exhaustive()
    }
}

/// Handle of the process-wide provider, if one was installed.
pub fn global_handle() -> Option<&'static PrometheusHandle> {
    GLOBAL_HANDLE.get().and_then(Option::as_ref)
}

/// Forwards to a shared recorder so the global slot and the owning system
/// observe the same registry.
struct SharedRecorder(Arc<PrometheusRecorder>);

impl Recorder for SharedRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.0.describe_counter(key, unit, description);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.0.describe_gauge(key, unit, description);
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.0.describe_histogram(key, unit, description);
    }

    fn register_counter(&self, key: &Key, metadata: &Metadata<'_>) -> Counter {
        self.0.register_counter(key, metadata)
    }

    fn register_gauge(&self, key: &Key, metadata: &Metadata<'_>) -> Gauge {
        self.0.register_gauge(key, metadata)
    }

    fn register_histogram(&self, key: &Key, metadata: &Metadata<'_>) -> Histogram {
        self.0.register_histogram(key, metadata)
    }
}
