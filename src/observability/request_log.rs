//! Request-scoped structured log fields.
//!
//! Fields accumulate while a request moves through the server: the HTTP layer
//! sets the message id and trace id, the dispatcher sets the handler name, a
//! handler may add a message key or message. The accumulator is passed
//! explicitly and merged into every log line at the point of emission.

use std::fmt;

/// Structured fields attached to every log line emitted for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFields {
    message_id: Option<String>,
    handler_name: Option<String>,
    msg_key: Option<String>,
    message: Option<String>,
    trace_id: Option<String>,
}

impl RequestFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = non_empty(message_id.into());
        self
    }

    pub fn with_handler_name(mut self, handler_name: impl Into<String>) -> Self {
        self.handler_name = non_empty(handler_name.into());
        self
    }

    pub fn with_msg_key(mut self, msg_key: impl Into<String>) -> Self {
        self.msg_key = non_empty(msg_key.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = non_empty(trace_id.into());
        self
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn handler_name(&self) -> Option<&str> {
        self.handler_name.as_deref()
    }

    pub fn msg_key(&self) -> Option<&str> {
        self.msg_key.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Log text prefixed with the handler name, when one is known.
    pub fn prefixed<'a>(&'a self, msg: &'a str) -> Prefixed<'a> {
        Prefixed { handler: self.handler_name(), msg }
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!(
            message_id = self.message_id(),
            handler_name = self.handler_name(),
            msg_key = self.msg_key(),
            request_message = self.message(),
            trace_id = self.trace_id(),
            "{}",
            self.prefixed(msg)
        );
    }

    pub fn info(&self, msg: &str) {
        tracing::info!(
            message_id = self.message_id(),
            handler_name = self.handler_name(),
            msg_key = self.msg_key(),
            request_message = self.message(),
            trace_id = self.trace_id(),
            "{}",
            self.prefixed(msg)
        );
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!(
            message_id = self.message_id(),
            handler_name = self.handler_name(),
            msg_key = self.msg_key(),
            request_message = self.message(),
            trace_id = self.trace_id(),
            "{}",
            self.prefixed(msg)
        );
    }

    pub fn error(&self, msg: &str) {
        tracing::error!(
            message_id = self.message_id(),
            handler_name = self.handler_name(),
            msg_key = self.msg_key(),
            request_message = self.message(),
            trace_id = self.trace_id(),
            "{}",
            self.prefixed(msg)
        );
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Display adapter for [`RequestFields::prefixed`].
pub struct Prefixed<'a> {
    handler: Option<&'a str>,
    msg: &'a str,
}

impl fmt::Display for Prefixed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handler {
            Some(handler) => write!(f, "{}: {}", handler, self.msg),
            None => f.write_str(self.msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_accumulate_independently() {
        let fields = RequestFields::new()
            .with_message_id("abc")
            .with_handler_name("Echo")
            .with_msg_key("k1")
            .with_message("hello");

        assert_eq!(fields.message_id(), Some("abc"));
        assert_eq!(fields.handler_name(), Some("Echo"));
        assert_eq!(fields.msg_key(), Some("k1"));
        assert_eq!(fields.message(), Some("hello"));
        assert_eq!(fields.trace_id(), None);
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let fields = RequestFields::new().with_handler_name("A").with_handler_name("B");
        assert_eq!(fields.handler_name(), Some("B"));
    }

    #[test]
    fn empty_values_are_not_recorded() {
        let fields = RequestFields::new().with_message_id("");
        assert_eq!(fields.message_id(), None);
    }

    #[test]
    fn prefix_uses_handler_name() {
        let fields = RequestFields::new();
        assert_eq!(fields.prefixed("new call").to_string(), "new call");

        let fields = fields.with_handler_name("Echo");
        assert_eq!(fields.prefixed("new call").to_string(), "Echo: new call");
    }
}
