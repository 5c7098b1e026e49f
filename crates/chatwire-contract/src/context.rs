use serde_json::Value;
use std::collections::BTreeMap;
use tracing::Span;

use crate::ids::generate_id;

/// Per-request context handed to every collaborator.
///
/// Owns the request's tracing span. Everything the core logs for this
/// request is recorded inside it, and the span closes when the last clone
/// of the context is dropped.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    user_id: Option<String>,
    metadata: BTreeMap<String, Value>,
    span: Span,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        let span = tracing::info_span!(
            "chatwire.request",
            request_id = %request_id,
            user_id = tracing::field::Empty,
            operation = tracing::field::Empty,
        );
        Self {
            request_id,
            user_id: None,
            metadata: BTreeMap::new(),
            span,
        }
    }

    /// Context with a freshly generated request id.
    pub fn generated() -> Self {
        Self::new(generate_id("req"))
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        self.span.record("user_id", user_id.as_str());
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Attach the request's operation kind to the span.
    pub fn record_operation(&self, operation: &str) {
        self.span.record("operation", operation);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Free-form metadata supplied with the request.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_merges_over_existing_keys() {
        let ctx = RequestContext::new("req_1")
            .with_user("user_1")
            .with_metadata(BTreeMap::from([("a".to_string(), json!(1))]))
            .with_metadata(BTreeMap::from([
                ("a".to_string(), json!(2)),
                ("b".to_string(), json!(true)),
            ]));
        assert_eq!(ctx.request_id(), "req_1");
        assert_eq!(ctx.user_id(), Some("user_1"));
        assert_eq!(ctx.metadata().get("a"), Some(&json!(2)));
        assert_eq!(ctx.metadata().len(), 2);
    }

    #[test]
    fn generated_ids_are_prefixed() {
        assert!(RequestContext::generated().request_id().starts_with("req_"));
    }
}
