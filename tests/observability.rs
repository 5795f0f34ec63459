//! Observability sidecar over real TCP.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use rpc_service::config::ObservabilityConfig;
use rpc_service::observability::collectors::ProcessCollector;
use rpc_service::observability::{
    Collector, ObservabilityError, ObservabilitySystem, RegistryError,
};
use tokio_util::sync::CancellationToken;

mod common;

fn local_config() -> ObservabilityConfig {
    ObservabilityConfig {
        bind_address: "127.0.0.1:0".into(),
        shutdown_timeout_secs: 2,
        ..ObservabilityConfig::default()
    }
}

struct QueueDepth;

impl Collector for QueueDepth {
    fn name(&self) -> &str {
        "queue_depth"
    }

    fn collect(&self) {
        metrics::gauge!("app_queue_depth").set(7.0);
    }
}

async fn start(
    system: &ObservabilitySystem,
) -> (String, CancellationToken, tokio::task::JoinHandle<Result<(), ObservabilityError>>) {
    let cancel = CancellationToken::new();
    let url = format!("http://{}", system.local_addr());
    let task = {
        let system = system.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { system.run(&cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    (url, cancel, task)
}

#[tokio::test]
async fn serves_root_metrics_and_profiles() {
    let system = ObservabilitySystem::new(&local_config()).await.unwrap();
    system.register_collector(Arc::new(QueueDepth)).unwrap();
    let (url, cancel, task) = start(&system).await;
    let http = common::http_client();

    let res = http.get(format!("{}/", url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert!(body.contains("/metrics"));
    assert!(body.contains("/debug/pprof/"));

    let body = http
        .get(format!("{}/metrics", url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("process_resident_memory_bytes"));
    assert!(body.contains("tokio_runtime_alive_tasks"));
    assert!(body.contains("app_queue_depth 7"));

    for name in ["goroutine", "heap", "threadcreate", "block", "symbol", "cmdline"] {
        let res = http
            .get(format!("{}/debug/pprof/{}", url, name))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "profile {}", name);
    }

    let res = http
        .get(format!("{}/debug/pprof/trace?seconds=1", url))
        .send()
        .await
        .unwrap();
    assert!(res.text().await.unwrap().starts_with("trace: seconds=1"));

    let res = http
        .get(format!("{}/debug/pprof/nonexistent", url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    cancel.cancel();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn duplicate_collector_keeps_first_visible() {
    let system = ObservabilitySystem::new(&local_config()).await.unwrap();

    let err = system
        .register_collector(Arc::new(ProcessCollector::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        ObservabilityError::Registry(RegistryError::DuplicateCollector(_))
    ));
    assert_eq!(
        system.collector_names().iter().filter(|n| *n == "process").count(),
        1
    );

    let (url, cancel, task) = start(&system).await;
    let body = common::http_client()
        .get(format!("{}/metrics", url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("process_resident_memory_bytes"));

    cancel.cancel();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn cancel_stops_both_tasks_within_timeout() {
    let system = ObservabilitySystem::new(&local_config()).await.unwrap();
    let addr = system.local_addr();
    let (_url, cancel, task) = start(&system).await;

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(3), task)
        .await
        .expect("run group did not finish")
        .unwrap();
    assert!(result.is_ok());

    assert!(tokio::net::TcpListener::bind(addr).await.is_ok());
}

#[tokio::test]
async fn registration_is_frozen_once_running() {
    let system = ObservabilitySystem::new(&local_config()).await.unwrap();
    let (_url, cancel, task) = start(&system).await;

    assert!(matches!(
        system.register_collector(Arc::new(QueueDepth)),
        Err(ObservabilityError::Registry(RegistryError::Frozen(_)))
    ));

    cancel.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn occupied_address_fails_construction() {
    let first = ObservabilitySystem::new(&local_config()).await.unwrap();
    let config = ObservabilityConfig {
        bind_address: first.local_addr().to_string(),
        ..local_config()
    };
    assert!(matches!(
        ObservabilitySystem::new(&config).await,
        Err(ObservabilityError::Listener(_))
    ));
}
