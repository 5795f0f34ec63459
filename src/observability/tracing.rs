//! Trace context propagation.
//!
//! # Responsibilities
//! - Install the W3C trace-context + baggage composite propagator, once
//! - Extract the trace ID from incoming request headers
//!
//! # Design Decisions
//! - Extraction goes through the process-wide propagator: until an
//!   observability system installs one, no trace ID is extracted
//! - Only IDs are propagated; spans are not exported

use std::sync::Once;

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};

static INSTALL_PROPAGATOR: Once = Once::new();

/// Trace-context plus baggage, in that order.
pub fn composite_propagator() -> TextMapCompositePropagator {
    let propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>> = vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ];
    TextMapCompositePropagator::new(propagators)
}

/// Install the composite propagator process-wide. Returns `false` if an
/// earlier call already did.
pub fn install_propagator() -> bool {
    let mut installed = false;
    INSTALL_PROPAGATOR.call_once(|| {
        opentelemetry::global::set_text_map_propagator(composite_propagator());
        installed = true;
    });
    installed
}

/// Read-only view of HTTP headers for propagators.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Trace ID carried by `headers`, via the process-wide propagator.
pub fn extract_trace_id(headers: &HeaderMap) -> Option<String> {
    let cx = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(headers))
    });
    trace_id_of(&cx)
}

/// Trace ID carried by `headers`, via the given propagator.
pub fn extract_trace_id_with(
    propagator: &dyn TextMapPropagator,
    headers: &HeaderMap,
) -> Option<String> {
    trace_id_of(&propagator.extract(&HeaderExtractor(headers)))
}

fn trace_id_of(cx: &Context) -> Option<String> {
    let span = cx.span();
    let span_context = span.span_context();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}
