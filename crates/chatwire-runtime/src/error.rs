use chatwire_contract::{ResponderError, StoreError};
use serde_json::{json, Value};
use thiserror::Error;

/// An inbound payload that does not decode into a known operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid request at `{path}`: {message}")]
pub struct ValidationError {
    /// JSON pointer to the offending value (`""` for the whole document).
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "error": {
                "code": "validation_error",
                "path": self.path,
                "message": self.message,
            }
        })
    }
}

/// Failures reported before a response starts, as one structured payload.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("storage failure: {0}")]
    Store(StoreError),

    #[error("responder failure: {0}")]
    Responder(#[from] ResponderError),
}

impl From<StoreError> for ProcessError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::InvalidId(msg) => Self::BadRequest(msg),
            other => Self::Store(other),
        }
    }
}

impl ProcessError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::NotConfigured(_) => "not_configured",
            Self::Store(_) | Self::Responder(_) => "internal_error",
        }
    }

    /// `{"error": {"code", "message"}}`. Internal detail is not exposed.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Validation(e) => e.to_payload(),
            Self::Store(_) | Self::Responder(_) => json!({
                "error": {"code": self.code(), "message": "internal error"}
            }),
            other => json!({
                "error": {"code": other.code(), "message": other.to_string()}
            }),
        }
    }
}

/// A persistence failure while processing a stream event.
#[derive(Debug, Error)]
#[error("persistence failed: {0}")]
pub struct PipelineError(#[from] pub StoreError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_payload_carries_path() {
        let err = ProcessError::from(ValidationError::new("/params/thread_id", "required"));
        assert_eq!(
            err.to_payload(),
            json!({"error": {"code": "validation_error", "path": "/params/thread_id", "message": "required"}})
        );
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err = ProcessError::from(StoreError::thread_not_found("thr_1"));
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_payload()["error"]["message"], "not found: thread thr_1");
    }

    #[test]
    fn backend_detail_is_hidden() {
        let err = ProcessError::from(StoreError::Backend("disk on fire".into()));
        assert_eq!(err.to_payload()["error"]["message"], "internal error");
    }
}
