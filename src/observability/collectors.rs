//! Built-in collectors registered by every observability system.
//!
//! - `process`: resident/virtual memory, CPU usage, start time, thread count
//! - `runtime`: tokio worker count, alive tasks, global queue depth
//! - `build_info`: constant gauge labelled with package name and version
//!
//! Snapshots are also used directly by the profiler endpoints.

use std::sync::Mutex;

use metrics::gauge;
use sysinfo::{Pid, System};

use crate::observability::registry::Collector;

/// One sample of this process's resource usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSnapshot {
    pub resident_memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    pub cpu_usage_percent: f32,
    pub start_time_seconds: u64,
    pub threads: Option<u64>,
}

/// Samples the current process through `sysinfo`.
///
/// CPU usage is a delta between refreshes, so the first sample reads 0.
pub struct ProcessSampler {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Process metrics unavailable on this platform");
                None
            }
        };
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }

    pub fn sample(&self) -> Option<ProcessSnapshot> {
        let pid = self.pid?;
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        if !system.refresh_process(pid) {
            return None;
        }
        let process = system.process(pid)?;

        Some(ProcessSnapshot {
            resident_memory_bytes: process.memory(),
            virtual_memory_bytes: process.virtual_memory(),
            cpu_usage_percent: process.cpu_usage(),
            start_time_seconds: process.start_time(),
            threads: thread_count(),
        })
    }
}

/// OS thread count of this process.
#[cfg(target_os = "linux")]
pub fn thread_count() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|count| count.trim().parse().ok())
}

#[cfg(not(target_os = "linux"))]
pub fn thread_count() -> Option<u64> {
    None
}

#[derive(Default)]
pub struct ProcessCollector {
    sampler: ProcessSampler,
}

impl ProcessCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &str {
        "process"
    }

    #[allow(clippy::cast_precision_loss)]
    fn collect(&self) {
        let Some(snapshot) = self.sampler.sample() else {
            return;
        };
        gauge!("process_resident_memory_bytes").set(snapshot.resident_memory_bytes as f64);
        gauge!("process_virtual_memory_bytes").set(snapshot.virtual_memory_bytes as f64);
        gauge!("process_cpu_usage_percent").set(f64::from(snapshot.cpu_usage_percent));
        gauge!("process_start_time_seconds").set(snapshot.start_time_seconds as f64);
        if let Some(threads) = snapshot.threads {
            gauge!("process_threads").set(threads as f64);
        }
    }
}

/// One sample of the tokio runtime driving the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    pub workers: usize,
    pub alive_tasks: usize,
    pub global_queue_depth: usize,
}

impl RuntimeSnapshot {
    /// Sample the current runtime; `None` outside a runtime context.
    pub fn current() -> Option<Self> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let metrics = handle.metrics();
        Some(Self {
            workers: metrics.num_workers(),
            alive_tasks: metrics.num_alive_tasks(),
            global_queue_depth: metrics.global_queue_depth(),
        })
    }
}

#[derive(Debug, Default)]
pub struct RuntimeCollector;

impl Collector for RuntimeCollector {
    fn name(&self) -> &str {
        "runtime"
    }

    #[allow(clippy::cast_precision_loss)]
    fn collect(&self) {
        let Some(snapshot) = RuntimeSnapshot::current() else {
            return;
        };
        gauge!("tokio_runtime_workers").set(snapshot.workers as f64);
        gauge!("tokio_runtime_alive_tasks").set(snapshot.alive_tasks as f64);
        gauge!("tokio_runtime_global_queue_depth").set(snapshot.global_queue_depth as f64);
    }
}

#[derive(Debug, Default)]
pub struct BuildInfoCollector;

impl Collector for BuildInfoCollector {
    fn name(&self) -> &str {
        "build_info"
    }

    fn collect(&self) {
        gauge!(
            "build_info",
            "name" => env!("CARGO_PKG_NAME"),
            "version" => env!("CARGO_PKG_VERSION")
        )
        .set(1.0);
    }
}
