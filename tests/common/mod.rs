//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rpc_service::config::ServiceConfig;
use rpc_service::rpc::{HandlerSet, MethodSet, RpcError};
use rpc_service::{App, Shutdown};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Config with both listeners on ephemeral loopback ports.
pub fn local_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.server.bind_address = "127.0.0.1:0".into();
    config.observability.bind_address = "127.0.0.1:0".into();
    config.shutdown.timeout_secs = 2;
    config.observability.shutdown_timeout_secs = 2;
    config
}

/// HTTP client that never goes through a system proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// A running [`App`] driven from a background task.
pub struct RunningApp {
    pub rpc_url: String,
    pub observability_url: Option<String>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<App>,
}

impl RunningApp {
    pub async fn start(config: ServiceConfig) -> Self {
        let mut app = App::new(config).await.unwrap();
        let rpc_url = format!("http://{}", app.rpc_addr());
        let observability_url = app.observability_addr().map(|a| format!("http://{}", a));
        let shutdown = app.shutdown_handle();

        let task = tokio::spawn(async move {
            app.run().await;
            app
        });
        wait_until_serving(&rpc_url).await;

        Self {
            rpc_url,
            observability_url,
            shutdown,
            task,
        }
    }

    /// Trigger shutdown and wait for `run` to return.
    pub async fn stop(self) -> App {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("app did not stop in time")
            .unwrap()
    }
}

/// Poll until the RPC endpoint answers.
pub async fn wait_until_serving(rpc_url: &str) {
    let client = http_client();
    for _ in 0..50 {
        if client
            .post(format!("{}/jsonrpc/v2", rpc_url))
            .body("{}")
            .send()
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} never started", rpc_url);
}

#[derive(Deserialize)]
pub struct SleepParams {
    pub millis: u64,
}

/// Handler set with a `Sleep` method, for drain tests.
pub struct SlowHandler;

impl HandlerSet for SlowHandler {
    fn method_set(self: Arc<Self>) -> MethodSet {
        MethodSet::new().method("Sleep", |p: SleepParams, _fields| async move {
            tokio::time::sleep(Duration::from_millis(p.millis)).await;
            Ok::<_, RpcError>(json!({ "slept_ms": p.millis }))
        })
    }
}

pub fn sleep_body(millis: u64) -> Value {
    json!({ "method": "Sleep", "params": { "millis": millis }, "id": 1 })
}
