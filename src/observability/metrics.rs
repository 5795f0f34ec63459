//! Metric definitions.
//!
//! # Metrics
//! - `rpc_requests_total` (counter): calls by method and result code
//! - `rpc_request_duration_seconds` (histogram): dispatch latency by method
//! - `rpc_in_flight_requests` (gauge): requests currently being served
//!
//! # Cardinality
//! - `method`: bounded by the registered method table; unknown names are
//!   folded into `"unknown"`
//! - `code`: bounded by the RPC error code set plus `0` for success
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade, so calls are no-ops until a
//!   provider is installed
//! - Histogram buckets are configured by the provider for every
//!   `*_duration_seconds` metric

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

pub const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
pub const RPC_REQUEST_DURATION_SECONDS: &str = "rpc_request_duration_seconds";
pub const RPC_IN_FLIGHT_REQUESTS: &str = "rpc_in_flight_requests";

/// Latency buckets for `*_duration_seconds` histograms.
pub const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
];

/// Register descriptions for the RPC metrics with the current recorder.
pub fn describe_rpc_metrics() {
    describe_counter!(RPC_REQUESTS_TOTAL, Unit::Count, "RPC calls by method and result code");
    describe_histogram!(
        RPC_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "RPC dispatch latency by method"
    );
    describe_gauge!(RPC_IN_FLIGHT_REQUESTS, Unit::Count, "RPC requests currently in flight");
}

/// Record one dispatched call. `code` is 0 for a successful result.
pub fn record_rpc_request(method: &str, code: i32, start: Instant) {
    counter!(
        RPC_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
    histogram!(RPC_REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Publish the number of requests currently in flight.
pub fn set_in_flight_requests(count: u64) {
    // u64 to f64 is exact for any realistic request count
    #[allow(clippy::cast_precision_loss)]
    gauge!(RPC_IN_FLIGHT_REQUESTS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    #[test]
    fn rpc_request_is_counted_with_labels() {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("_duration_seconds".into()), DURATION_BUCKETS)
            .unwrap()
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_rpc_metrics();
            record_rpc_request("Echo", 0, Instant::now());
            record_rpc_request("unknown", -32601, Instant::now());
            set_in_flight_requests(3);
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"rpc_requests_total{method="Echo",code="0"} 1"#));
        assert!(rendered.contains(r#"rpc_requests_total{method="unknown",code="-32601"} 1"#));
        assert!(rendered.contains("rpc_request_duration_seconds_bucket"));
        assert!(rendered.contains("rpc_in_flight_requests 3"));
    }
}
