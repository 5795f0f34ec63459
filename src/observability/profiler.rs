//! Profiler endpoints under `/debug/pprof/`.
//!
//! # Profiles
//! - `cmdline`: process arguments, NUL-separated
//! - `profile?seconds=N`: process CPU and memory sampled once per second
//! - `symbol`: symbolization is not supported, always `num_symbols: 0`
//! - `trace?seconds=N`: runtime worker/task/queue samples every 100ms
//! - `goroutine`, `heap`, `threadcreate`, `block`: point-in-time reports
//!
//! Unknown profile names answer 404.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::observability::collectors::{thread_count, ProcessSampler, RuntimeSnapshot};

pub const DEFAULT_PROFILE_SECONDS: u64 = 30;
pub const DEFAULT_TRACE_SECONDS: u64 = 1;
pub const MAX_PROFILE_SECONDS: u64 = 60;

const TRACE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Cmdline,
    Profile,
    Symbol,
    Trace,
    Goroutine,
    Heap,
    ThreadCreate,
    Block,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 8] = [
        ProfileKind::Block,
        ProfileKind::Cmdline,
        ProfileKind::Goroutine,
        ProfileKind::Heap,
        ProfileKind::Profile,
        ProfileKind::Symbol,
        ProfileKind::ThreadCreate,
        ProfileKind::Trace,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ProfileKind::Cmdline => "cmdline",
            ProfileKind::Profile => "profile",
            ProfileKind::Symbol => "symbol",
            ProfileKind::Trace => "trace",
            ProfileKind::Goroutine => "goroutine",
            ProfileKind::Heap => "heap",
            ProfileKind::ThreadCreate => "threadcreate",
            ProfileKind::Block => "block",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ProfileKind::Cmdline => "command line of the running process",
            ProfileKind::Profile => "CPU and memory samples, ?seconds=N (default 30)",
            ProfileKind::Symbol => "symbol lookup (unsupported)",
            ProfileKind::Trace => "runtime samples, ?seconds=N (default 1)",
            ProfileKind::Goroutine => "async runtime workers and live tasks",
            ProfileKind::Heap => "resident and virtual memory",
            ProfileKind::ThreadCreate => "OS threads of the process",
            ProfileKind::Block => "tasks waiting in the runtime global queue",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileParams {
    seconds: Option<u64>,
}

impl ProfileParams {
    /// Requested duration; zero or missing falls back to `default`, capped
    /// at [`MAX_PROFILE_SECONDS`].
    pub fn seconds_or(&self, default: u64) -> u64 {
        match self.seconds {
            None | Some(0) => default,
            Some(n) => n.min(MAX_PROFILE_SECONDS),
        }
    }
}

/// Profiler routes, sharing the process sampler with the `process` collector.
pub fn profiler_routes(sampler: Arc<ProcessSampler>) -> Router {
    Router::new()
        .route("/debug/pprof", get(index))
        .route("/debug/pprof/", get(index))
        .route("/debug/pprof/{name}", get(profile))
        .with_state(sampler)
}

fn text(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

async fn index() -> Response {
    let mut body = String::from("/debug/pprof/\n\nProfiles:\n");
    for kind in ProfileKind::ALL {
        let _ = writeln!(body, "  {:<14}{}", kind.name(), kind.description());
    }
    text(body)
}

async fn profile(
    State(sampler): State<Arc<ProcessSampler>>,
    Path(name): Path<String>,
    Query(params): Query<ProfileParams>,
) -> Response {
    let Some(kind) = ProfileKind::from_name(&name) else {
        return (StatusCode::NOT_FOUND, format!("Unknown profile: {}\n", name)).into_response();
    };

    tracing::debug!(profile = kind.name(), "Profile requested");

    let body = match kind {
        ProfileKind::Cmdline => std::env::args().collect::<Vec<_>>().join("\0"),
        ProfileKind::Symbol => "num_symbols: 0\n".to_string(),
        ProfileKind::Profile => cpu_profile(&sampler, params.seconds_or(DEFAULT_PROFILE_SECONDS)).await,
        ProfileKind::Trace => runtime_trace(params.seconds_or(DEFAULT_TRACE_SECONDS)).await,
        ProfileKind::Goroutine => goroutine_report(),
        ProfileKind::Heap => heap_report(&sampler),
        ProfileKind::ThreadCreate => thread_report(),
        ProfileKind::Block => block_report(),
    };
    text(body)
}

async fn cpu_profile(sampler: &ProcessSampler, seconds: u64) -> String {
    let mut out = format!("profile: seconds={}\nelapsed_s cpu_percent rss_bytes vms_bytes\n", seconds);

    // Baseline: CPU usage is a delta from the previous refresh.
    let _ = sampler.sample();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    for elapsed in 1..=seconds {
        ticker.tick().await;
        match sampler.sample() {
            Some(s) => {
                let _ = writeln!(
                    out,
                    "{} {:.2} {} {}",
                    elapsed, s.cpu_usage_percent, s.resident_memory_bytes, s.virtual_memory_bytes
                );
            }
            None => {
                out.push_str("process sampling unavailable\n");
                break;
            }
        }
    }
    out
}

async fn runtime_trace(seconds: u64) -> String {
    let mut out = format!("trace: seconds={}\nelapsed_ms workers alive_tasks global_queue_depth\n", seconds);

    let samples = seconds * 1000 / TRACE_INTERVAL.as_millis() as u64;
    let mut ticker = tokio::time::interval(TRACE_INTERVAL);
    let start = tokio::time::Instant::now();

    for _ in 0..samples {
        ticker.tick().await;
        if let Some(s) = RuntimeSnapshot::current() {
            let _ = writeln!(
                out,
                "{} {} {} {}",
                start.elapsed().as_millis(),
                s.workers,
                s.alive_tasks,
                s.global_queue_depth
            );
        }
    }
    out
}

fn goroutine_report() -> String {
    match RuntimeSnapshot::current() {
        Some(s) => format!(
            "runtime: workers={} alive_tasks={}\n",
            s.workers, s.alive_tasks
        ),
        None => "runtime: unavailable\n".to_string(),
    }
}

fn heap_report(sampler: &ProcessSampler) -> String {
    match sampler.sample() {
        Some(s) => format!(
            "heap: resident_bytes={} virtual_bytes={}\n",
            s.resident_memory_bytes, s.virtual_memory_bytes
        ),
        None => "heap: unavailable\n".to_string(),
    }
}

fn thread_report() -> String {
    match thread_count() {
        Some(n) => format!("threadcreate: threads={}\n", n),
        None => "threadcreate: unavailable\n".to_string(),
    }
}

fn block_report() -> String {
    match RuntimeSnapshot::current() {
        Some(s) => format!("block: global_queue_depth={}\n", s.global_queue_depth),
        None => "block: unavailable\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let app = profiler_routes(Arc::new(ProcessSampler::new()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn profile_names_round_trip() {
        for kind in ProfileKind::ALL {
            assert_eq!(ProfileKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ProfileKind::from_name("mutex"), None);
    }

    #[test]
    fn seconds_default_and_cap() {
        assert_eq!(ProfileParams { seconds: None }.seconds_or(30), 30);
        assert_eq!(ProfileParams { seconds: Some(0) }.seconds_or(30), 30);
        assert_eq!(ProfileParams { seconds: Some(5) }.seconds_or(30), 5);
        assert_eq!(ProfileParams { seconds: Some(600) }.seconds_or(30), MAX_PROFILE_SECONDS);
    }

    #[tokio::test]
    async fn index_lists_profiles() {
        let (status, body) = get_body("/debug/pprof/").await;
        assert_eq!(status, StatusCode::OK);
        for kind in ProfileKind::ALL {
            assert!(body.contains(kind.name()));
        }
    }

    #[tokio::test]
    async fn symbol_reports_none() {
        let (status, body) = get_body("/debug/pprof/symbol").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "num_symbols: 0\n");
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let (status, _) = get_body("/debug/pprof/mutex").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cmdline_is_nul_separated_args() {
        let (_, body) = get_body("/debug/pprof/cmdline").await;
        let expected: Vec<String> = std::env::args().collect();
        assert_eq!(body.split('\0').collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn short_cpu_profile_has_one_sample() {
        let (status, body) = get_body("/debug/pprof/profile?seconds=1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("profile: seconds=1\n"));
        assert_eq!(body.lines().count(), 3);
    }

    #[tokio::test]
    async fn goroutine_reports_runtime() {
        let (_, body) = get_body("/debug/pprof/goroutine").await;
        assert!(body.starts_with("runtime: workers="));
    }
}
