//! Observability sidecar: health root, metrics exposition and profiler.
//!
//! # Responsibilities
//! - Build the collector registry and the Prometheus provider
//! - Install the provider and the trace propagator process-wide, once
//! - Serve `/`, `/metrics` and `/debug/pprof/*` on a dedicated listener
//! - Run the accept loop and its shutdown watcher as one run group
//!
//! # Data Flow
//! ```text
//! ObservabilitySystem::new(config)
//!     → registry (process, runtime, build_info)
//!     → MetricsProvider (recorder + render handle)
//!     → install_global / install_propagator
//!     → router + bound listener
//!
//! run(cancel)
//!     ├─ accept loop ─── exits on drain or error, cancels the group
//!     └─ watcher ─────── waits for cancel, then shutdown(timeout)
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::ObservabilityConfig;
use crate::http::graceful::GracefulServe;
use crate::lifecycle::RunGroup;
use crate::net::{listener, ListenerError};
use crate::observability::collectors::{
    BuildInfoCollector, ProcessCollector, ProcessSampler, RuntimeCollector,
};
use crate::observability::profiler::profiler_routes;
use crate::observability::provider::MetricsProvider;
use crate::observability::registry::{Collector, MetricsRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("metrics registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("metrics exporter error: {0}")]
    Exporter(#[from] BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("observability server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("observability server did not shut down within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("observability system is already running")]
    AlreadyRunning,

    #[error("observability system has been stopped")]
    Stopped,

    #[error("observability task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Clone)]
struct MetricsState {
    registry: Arc<MetricsRegistry>,
    provider: MetricsProvider,
}

/// Ownership of the sidecar listener across the lifecycle.
enum ListenerSlot {
    Ready(TcpListener),
    Serving,
    Stopped,
}

struct Inner {
    registry: Arc<MetricsRegistry>,
    provider: MetricsProvider,
    router: Router,
    listener: Mutex<ListenerSlot>,
    local_addr: SocketAddr,
    serve: GracefulServe,
    shutdown_timeout: Duration,
}

/// Handle to the observability sidecar. Clones share one system.
#[derive(Clone)]
pub struct ObservabilitySystem {
    inner: Arc<Inner>,
}

impl ObservabilitySystem {
    pub async fn new(config: &ObservabilityConfig) -> Result<Self, ObservabilityError> {
        let registry = Arc::new(MetricsRegistry::new());
        registry.register(Arc::new(ProcessCollector::new()))?;
        registry.register(Arc::new(RuntimeCollector))?;
        registry.register(Arc::new(BuildInfoCollector))?;

        let provider = MetricsProvider::new()?;

        provider.install_global();
        if !crate::observability::tracing::install_propagator() {
            tracing::debug!("Trace propagator already installed");
        }

        let router = Router::new()
            .route("/", get(root))
            .route("/metrics", get(metrics_handler))
            .with_state(MetricsState {
                registry: Arc::clone(&registry),
                provider: provider.clone(),
            })
            .merge(profiler_routes(Arc::new(ProcessSampler::new())))
            .layer(TraceLayer::new_for_http());

        let (listener, local_addr) = listener::bind(config.effective_bind_address()).await?;

        tracing::info!(address = %local_addr, "Metrics initialized");

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                provider,
                router,
                listener: Mutex::new(ListenerSlot::Ready(listener)),
                local_addr,
                serve: GracefulServe::new(),
                shutdown_timeout: config.shutdown_timeout(),
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    pub fn provider(&self) -> &MetricsProvider {
        &self.inner.provider
    }

    pub fn collector_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    /// Add a collector. Only allowed before [`run`](Self::run).
    pub fn register_collector(&self, collector: Arc<dyn Collector>) -> Result<(), ObservabilityError> {
        Ok(self.inner.registry.register(collector)?)
    }

    /// Serve until `cancel` fires or the accept loop fails.
    ///
    /// Returns after both the accept loop and the shutdown watcher returned.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), ObservabilityError> {
        let listener = {
            let mut slot = self.inner.listener.lock().unwrap_or_else(|e| e.into_inner());
            match std::mem::replace(&mut *slot, ListenerSlot::Serving) {
                ListenerSlot::Ready(listener) => listener,
                ListenerSlot::Serving => return Err(ObservabilityError::AlreadyRunning),
                ListenerSlot::Stopped => {
                    *slot = ListenerSlot::Stopped;
                    return Err(ObservabilityError::Stopped);
                }
            }
        };
        self.inner.registry.freeze();

        let mut group = RunGroup::<ObservabilityError>::new(cancel);
        let token = group.token();

        let this = self.clone();
        let serve_token = token.clone();
        group.spawn(async move {
            tracing::info!(address = %this.inner.local_addr, "Observability server started");
            let result = this
                .inner
                .serve
                .serve(listener, this.inner.router.clone())
                .await
                .map_err(ObservabilityError::Serve);
            serve_token.cancel();
            result
        });

        let this = self.clone();
        group.spawn(async move {
            token.cancelled().await;
            this.shutdown(this.inner.shutdown_timeout).await
        });

        let result = group.wait().await;
        *self.inner.listener.lock().unwrap_or_else(|e| e.into_inner()) = ListenerSlot::Stopped;
        tracing::info!("Observability server stopped");
        result
    }

    /// Drain within `deadline`, then force-close. Releases the listener if
    /// the system never started serving.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ObservabilityError> {
        let previous = std::mem::replace(
            &mut *self.inner.listener.lock().unwrap_or_else(|e| e.into_inner()),
            ListenerSlot::Stopped,
        );
        if let ListenerSlot::Ready(_) = previous {
            tracing::debug!("Observability listener released without serving");
            return Ok(());
        }

        self.inner
            .serve
            .shutdown(deadline)
            .await
            .map_err(|e| ObservabilityError::ShutdownTimeout(e.0))
    }
}

impl std::fmt::Debug for ObservabilitySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilitySystem")
            .field("local_addr", &self.inner.local_addr)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

const ENDPOINTS: &[(&str, &str)] = &[
    ("/metrics", "prometheus metrics"),
    ("/debug/pprof/", "profiler endpoints"),
];

async fn root() -> Response {
    let mut body = String::from("Service is up and running.\n\nAvailable debug endpoints:\n");
    for (path, description) in ENDPOINTS {
        body.push_str(&format!("{:<20} - {}\n", path, description));
    }
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    state.registry.collect_into(state.provider.recorder());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.provider.render(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn local_config() -> ObservabilityConfig {
        ObservabilityConfig {
            bind_address: "127.0.0.1:0".into(),
            ..ObservabilityConfig::default()
        }
    }

    async fn get(system: &ObservabilitySystem, uri: &str) -> (StatusCode, String) {
        let response = system
            .inner
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let system = ObservabilitySystem::new(&local_config()).await.unwrap();
        let (status, body) = get(&system, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("Service is up and running."));
        assert!(body.contains("/metrics"));
        assert!(body.contains("/debug/pprof/"));
    }

    #[tokio::test]
    async fn metrics_include_builtin_collectors() {
        let system = ObservabilitySystem::new(&local_config()).await.unwrap();
        assert_eq!(system.collector_names(), vec!["process", "runtime", "build_info"]);

        let (status, body) = get(&system, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("process_resident_memory_bytes"));
        assert!(body.contains("tokio_runtime_workers"));
        assert!(body.contains("build_info{"));
    }

    #[tokio::test]
    async fn duplicate_collector_is_rejected() {
        let system = ObservabilitySystem::new(&local_config()).await.unwrap();
        let err = system
            .register_collector(Arc::new(ProcessCollector::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            ObservabilityError::Registry(RegistryError::DuplicateCollector(ref name)) if name == "process"
        ));
    }

    #[tokio::test]
    async fn empty_bind_address_falls_back_to_default_port() {
        let config = ObservabilityConfig {
            bind_address: String::new(),
            ..ObservabilityConfig::default()
        };

        match ObservabilitySystem::new(&config).await {
            Ok(system) => {
                assert_eq!(system.local_addr().port(), 53000);
                system.shutdown(Duration::from_secs(1)).await.unwrap();
            }
            // Something else on this host holds the default port.
            Err(ObservabilityError::Listener(ListenerError::Bind { address, .. })) => {
                assert_eq!(address.port(), 53000);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn shutdown_without_run_releases_listener() {
        let system = ObservabilitySystem::new(&local_config()).await.unwrap();
        let addr = system.local_addr();

        system.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(TcpListener::bind(addr).await.is_ok());

        let cancel = CancellationToken::new();
        assert!(matches!(system.run(&cancel).await, Err(ObservabilityError::Stopped)));
    }

    #[tokio::test]
    async fn cancel_stops_run_cleanly() {
        let system = ObservabilitySystem::new(&local_config()).await.unwrap();
        let cancel = CancellationToken::new();

        let task = {
            let system = system.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { system.run(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(system.run(&cancel).await, Err(ObservabilityError::AlreadyRunning)));
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(result.is_ok());
        assert!(matches!(
            system.register_collector(Arc::new(RuntimeCollector)),
            Err(ObservabilityError::Registry(RegistryError::Frozen(_)))
        ));
        assert!(matches!(system.run(&cancel).await, Err(ObservabilityError::Stopped)));
    }
}
