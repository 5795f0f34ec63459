//! RPC server lifecycle.
//!
//! # Responsibilities
//! - Bind the RPC listener at construction
//! - Register handler sets and build the router on `init`
//! - Serve `POST /jsonrpc/v2` until stopped
//! - Drain in-flight requests within a deadline on `stop`
//!
//! # States
//! ```text
//! Created ──init──→ Initialized ──run──→ Running ──stop──→ Stopped
//! ```
//! Transitions are one-way; a stopped server cannot be re-initialized.
//!
//! # Design Decisions
//! - The listener is bound before any task is spawned so port conflicts fail
//!   startup
//! - RPC-level failures are answered with HTTP 200 and an error envelope
//! - Request ID is generated as early as possible and echoed back

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::graceful::{abort_on_force_close, GracefulServe};
use crate::http::request::request_fields;
use crate::net::{listener, track_in_flight, InFlightTracker, ListenerError};
use crate::rpc::{DispatchError, Dispatcher, HandlerSet};

/// The single RPC route.
pub const RPC_PATH: &str = "/jsonrpc/v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Initialized,
    Running,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("failed to register handlers: {0}")]
    Registration(#[from] DispatchError),

    #[error("invalid server state: expected {expected:?}, found {actual:?}")]
    InvalidState {
        expected: ServerState,
        actual: ServerState,
    },

    #[error("server is not initialized")]
    NotInitialized,

    #[error("server is not running")]
    NotRunning,

    #[error("server failed while serving: {0}")]
    Serve(#[source] std::io::Error),

    #[error("shutdown did not complete within {deadline:?}, {force_closed} request(s) force-closed")]
    ShutdownTimeout { deadline: Duration, force_closed: u64 },
}

#[derive(Default)]
struct Resources {
    listener: Option<TcpListener>,
    router: Option<Router>,
}

/// HTTP server exposing a [`Dispatcher`] on [`RPC_PATH`].
pub struct RpcServer {
    config: ServerConfig,
    local_addr: SocketAddr,
    resources: Mutex<Resources>,
    state: watch::Sender<ServerState>,
    serve: GracefulServe,
    in_flight: InFlightTracker,
}

impl RpcServer {
    /// Bind the listener. The server starts in [`ServerState::Created`].
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let (listener, local_addr) = listener::bind(&config.bind_address).await?;

        Ok(Self {
            config,
            local_addr,
            resources: Mutex::new(Resources {
                listener: Some(listener),
                router: None,
            }),
            state: watch::channel(ServerState::Created).0,
            serve: GracefulServe::new(),
            in_flight: InFlightTracker::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.active_count()
    }

    /// Register `handlers` and build the router.
    pub fn init<H: HandlerSet>(&self, handlers: Arc<H>) -> Result<(), ServerError> {
        let mut resources = self.lock_resources();
        let actual = self.state();
        if actual != ServerState::Created {
            return Err(ServerError::InvalidState {
                expected: ServerState::Created,
                actual,
            });
        }

        let mut dispatcher = Dispatcher::new();
        dispatcher.register_handler_set(handlers)?;

        tracing::info!(methods = ?dispatcher.method_names(), "RPC handlers registered");

        resources.router = Some(self.build_router(Arc::new(dispatcher)));
        self.state.send_replace(ServerState::Initialized);
        Ok(())
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&self, dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .route(RPC_PATH, post(rpc_handler))
            .with_state(dispatcher)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(TimeoutLayer::new(self.config.request_timeout()))
            .layer(middleware::from_fn_with_state(
                self.serve.force_token(),
                abort_on_force_close,
            ))
            .layer(middleware::from_fn_with_state(
                self.in_flight.clone(),
                track_in_flight,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until stopped. Returns `Ok(())` right away if already stopped.
    pub async fn run(&self) -> Result<(), ServerError> {
        let (listener, router) = {
            let mut resources = self.lock_resources();
            match self.state() {
                ServerState::Stopped => return Ok(()),
                ServerState::Created => return Err(ServerError::NotInitialized),
                ServerState::Running => {
                    return Err(ServerError::InvalidState {
                        expected: ServerState::Initialized,
                        actual: ServerState::Running,
                    })
                }
                ServerState::Initialized => {}
            }
            let (Some(listener), Some(router)) = (resources.listener.take(), resources.router.take())
            else {
                return Err(ServerError::NotInitialized);
            };
            self.state.send_replace(ServerState::Running);
            (listener, router)
        };

        tracing::info!(address = %self.local_addr, path = RPC_PATH, "RPC server started");

        let result = self.serve.serve(listener, router).await;
        self.state.send_replace(ServerState::Stopped);

        match result {
            Ok(()) => {
                tracing::info!("RPC server stopped");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "RPC server failed");
                Err(ServerError::Serve(e))
            }
        }
    }

    /// Resolves once the server has left [`ServerState::Initialized`].
    pub async fn wait_started(&self) {
        let mut state = self.state.subscribe();
        let _ = state
            .wait_for(|s| !matches!(s, ServerState::Created | ServerState::Initialized))
            .await;
    }

    /// Stop accepting, drain within `deadline`, then force-close the rest.
    pub async fn stop(&self, deadline: Duration) -> Result<(), ServerError> {
        if self.state() != ServerState::Running {
            return Err(ServerError::NotRunning);
        }

        let in_flight = self.in_flight.active_count();
        tracing::info!(in_flight, deadline_secs = deadline.as_secs_f64(), "RPC server draining");

        let result = match self.serve.drain(deadline).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let force_closed = self.in_flight.active_count();
                self.serve.force_close().await;
                tracing::warn!(force_closed, "RPC server drain timed out, connections force-closed");
                Err(ServerError::ShutdownTimeout { deadline, force_closed })
            }
        };

        self.state.send_replace(ServerState::Stopped);
        result
    }

    fn lock_resources(&self) -> std::sync::MutexGuard<'_, Resources> {
        self.resources.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn rpc_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let fields = request_fields(&headers);
    Json(dispatcher.dispatch(&body, fields).await).into_response()
}
