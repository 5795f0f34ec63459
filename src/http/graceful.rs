//! Graceful serve/drain control shared by both listeners.
//!
//! # Responsibilities
//! - Run the accept loop until a drain is requested
//! - Bound the drain by a deadline, then abort in-flight requests
//! - Signal when the accept loop has fully returned
//!
//! # Design Decisions
//! - Drain and force-close are separate tokens: drain stops accepting and lets
//!   requests finish, force-close answers whatever is left with 503
//! - A drain requested before the accept loop starts makes it exit at once

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How long to wait for the accept loop to unwind after a forced close.
const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Returned when in-flight work outlived the drain deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("drain did not complete within {0:?}")]
pub struct DrainTimeout(pub Duration);

/// Drain/force-close control for one listener.
#[derive(Debug)]
pub struct GracefulServe {
    drain: CancellationToken,
    force: CancellationToken,
    started: watch::Sender<bool>,
    finished: watch::Sender<bool>,
}

impl Default for GracefulServe {
    fn default() -> Self {
        Self::new()
    }
}

impl GracefulServe {
    pub fn new() -> Self {
        Self {
            drain: CancellationToken::new(),
            force: CancellationToken::new(),
            started: watch::channel(false).0,
            finished: watch::channel(false).0,
        }
    }

    /// Token cancelled when remaining requests must be abandoned.
    pub fn force_token(&self) -> CancellationToken {
        self.force.clone()
    }

    pub fn is_draining(&self) -> bool {
        self.drain.is_cancelled()
    }

    /// Serve `app` on `listener` until drained or force-closed.
    pub async fn serve(&self, listener: TcpListener, app: Router) -> std::io::Result<()> {
        self.started.send_replace(true);

        let drain = self.drain.clone();
        let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move { drain.cancelled().await })
            .into_future();

        let result = tokio::select! {
            result = server => result,
            () = self.force.cancelled() => Ok(()),
        };

        self.finished.send_replace(true);
        result
    }

    /// Stop accepting, wait up to `deadline` for in-flight requests, then
    /// force-close the rest.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), DrainTimeout> {
        if let Err(timeout) = self.drain(deadline).await {
            self.force_close().await;
            return Err(timeout);
        }
        Ok(())
    }

    /// Stop accepting and wait up to `deadline` for the accept loop to return.
    pub async fn drain(&self, deadline: Duration) -> Result<(), DrainTimeout> {
        self.drain.cancel();

        if !*self.started.borrow() {
            return Ok(());
        }

        let mut finished = self.finished.subscribe();
        tokio::time::timeout(deadline, finished.wait_for(|done| *done))
            .await
            .map(|_| ())
            .map_err(|_| DrainTimeout(deadline))
    }

    /// Abort in-flight requests and wait briefly for the accept loop.
    pub async fn force_close(&self) {
        self.force.cancel();
        let mut finished = self.finished.subscribe();
        let _ = tokio::time::timeout(FORCE_CLOSE_GRACE, finished.wait_for(|done| *done)).await;
    }
}

/// Middleware answering in-flight requests with 503 once force-close fires.
pub async fn abort_on_force_close(
    State(force): State<CancellationToken>,
    request: Request<Body>,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        () = force.cancelled() => {
            (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response()
        }
    }
}
