//! Request identification.
//!
//! # Responsibilities
//! - Request IDs: generated as UUID v4 by the server layer, or taken from the
//!   caller's `x-request-id`
//! - Trace context: extracted from `traceparent`/`baggage` headers
//! - Seed the request-scoped log fields from both

use axum::http::{HeaderMap, HeaderName};

use crate::observability::request_log::RequestFields;
use crate::observability::tracing::extract_trace_id;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Read the request ID header, if present and valid UTF-8.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

/// Build the initial log fields for an incoming request.
pub fn request_fields(headers: &HeaderMap) -> RequestFields {
    let mut fields = RequestFields::new();
    if let Some(id) = request_id(headers) {
        fields = fields.with_message_id(id);
    }
    if let Some(trace_id) = extract_trace_id(headers) {
        fields = fields.with_trace_id(trace_id);
    }
    fields
}
