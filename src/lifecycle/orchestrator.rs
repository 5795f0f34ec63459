//! Process orchestration.
//!
//! # Responsibilities
//! - Build handlers, the RPC server and the observability system
//! - Run both listeners concurrently
//! - Wait for a signal, an explicit shutdown or a component failure
//! - Stop everything within configured deadlines
//!
//! # Design Decisions
//! - Fail fast: any construction error is returned before a task is spawned
//! - Shutdown errors are logged, never escalated
//! - Both listeners are bound in `new`, so the addresses are known up front

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

use crate::config::ServiceConfig;
use crate::handler::EchoHandler;
use crate::http::{RpcServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{ObservabilityError, ObservabilitySystem};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("RPC server: {0}")]
    Server(#[from] ServerError),

    #[error("observability: {0}")]
    Observability(#[from] ObservabilityError),
}

type ServerTask = JoinHandle<Result<(), ServerError>>;
type ObservabilityTask = JoinHandle<Result<(), ObservabilityError>>;

/// Top-level owner of the service's components.
pub struct App {
    config: ServiceConfig,
    server: Arc<RpcServer>,
    observability: Option<ObservabilitySystem>,
    shutdown: Shutdown,
    server_task: Option<ServerTask>,
    observability_task: Option<ObservabilityTask>,
}

enum Exit {
    Signal,
    Requested,
    Server(Result<Result<(), ServerError>, JoinError>),
    Observability(Result<Result<(), ObservabilityError>, JoinError>),
}

impl App {
    pub async fn new(config: ServiceConfig) -> Result<Self, AppError> {
        tracing::info!("Creating handlers");
        let handlers = Arc::new(EchoHandler::new());

        tracing::info!("Creating RPC server");
        let server = RpcServer::bind(config.server.clone()).await?;
        server.init(handlers)?;

        let observability = if config.observability.enabled {
            Some(ObservabilitySystem::new(&config.observability).await?)
        } else {
            tracing::info!("Observability sidecar disabled");
            None
        };

        Ok(Self {
            config,
            server: Arc::new(server),
            observability,
            shutdown: Shutdown::new(),
            server_task: None,
            observability_task: None,
        })
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn observability_addr(&self) -> Option<SocketAddr> {
        self.observability.as_ref().map(ObservabilitySystem::local_addr)
    }

    /// Handle for triggering shutdown without a signal.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run until a signal, a shutdown request or a component failure, then
    /// stop.
    pub async fn run(&mut self) {
        let server = Arc::clone(&self.server);
        self.server_task = Some(tokio::spawn(async move { server.run().await }));

        if let Some(system) = self.observability.clone() {
            let token = self.shutdown.token();
            self.observability_task = Some(tokio::spawn(async move { system.run(&token).await }));
        }

        self.server.wait_started().await;
        tracing::info!(
            rpc_address = %self.rpc_addr(),
            observability_address = ?self.observability_addr(),
            "Service running"
        );

        let exit = tokio::select! {
            () = signals::shutdown_signal() => Exit::Signal,
            () = self.shutdown.wait() => Exit::Requested,
            joined = wait_task(&mut self.server_task) => Exit::Server(joined),
            joined = wait_task(&mut self.observability_task) => Exit::Observability(joined),
        };

        match exit {
            Exit::Signal => {}
            Exit::Requested => tracing::info!("Shutdown requested"),
            Exit::Server(joined) => {
                self.server_task = None;
                match joined {
                    Ok(Ok(())) => tracing::info!("RPC server exited"),
                    Ok(Err(e)) => tracing::error!(error = %e, "RPC server failed"),
                    Err(e) => tracing::error!(error = %e, "RPC server task failed"),
                }
            }
            Exit::Observability(joined) => {
                self.observability_task = None;
                match joined {
                    Ok(Ok(())) => tracing::info!("Observability system exited"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Observability system failed"),
                    Err(e) => tracing::error!(error = %e, "Observability task failed"),
                }
            }
        }

        self.stop().await;
    }

    /// Stop both components within their deadlines. Errors are logged.
    pub async fn stop(&mut self) {
        tracing::info!("Service stopping");
        self.shutdown.trigger();

        let deadline = self.config.shutdown.timeout();
        match self.server.stop(deadline).await {
            Ok(()) => {}
            Err(ServerError::NotRunning) => tracing::debug!("RPC server was not running"),
            Err(e) => tracing::warn!(error = %e, "RPC server shutdown incomplete"),
        }

        if let Some(task) = self.server_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "RPC server failed"),
                Err(e) => tracing::error!(error = %e, "RPC server task failed"),
            }
        }

        if let Some(task) = self.observability_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Observability shutdown incomplete"),
                Err(e) => tracing::error!(error = %e, "Observability task failed"),
            }
        } else if let Some(system) = &self.observability {
            if let Err(e) = system.shutdown(self.config.observability.shutdown_timeout()).await {
                tracing::warn!(error = %e, "Observability shutdown incomplete");
            }
        }

        tracing::info!("Shutdown complete");
    }
}

/// Await an optional task; pends forever when there is none.
async fn wait_task<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
