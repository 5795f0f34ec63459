//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served by a listener
//! - Let shutdown report how much work it is draining or abandoning
//! - Generate unique request sequence numbers for tracing

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::observability::metrics;

/// Global atomic counter for request sequence numbers.
/// Relaxed ordering is sufficient since we only need uniqueness.
static REQUEST_SEQ_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique sequence number of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestSeq(u64);

impl RequestSeq {
    pub fn next() -> Self {
        Self(REQUEST_SEQ_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Tracks in-flight requests for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active_count: Arc<AtomicU64>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new in-flight request. Returns a guard that decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_in_flight_requests(active);
        InFlightGuard {
            active_count: Arc::clone(&self.active_count),
            seq: RequestSeq::next(),
        }
    }

    /// Current in-flight request count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks one request's lifetime.
/// Decrements the in-flight count when dropped, including on cancellation.
#[derive(Debug)]
pub struct InFlightGuard {
    active_count: Arc<AtomicU64>,
    seq: RequestSeq,
}

impl InFlightGuard {
    pub fn seq(&self) -> RequestSeq {
        self.seq
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_in_flight_requests(active);
        tracing::trace!(request_seq = %self.seq, "Request finished");
    }
}

/// Middleware holding an [`InFlightGuard`] for the duration of each request.
pub async fn track_in_flight(
    State(tracker): State<InFlightTracker>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let _guard = tracker.track();
    next.run(request).await
}
