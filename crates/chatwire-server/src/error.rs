use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chatwire_runtime::ProcessError;

/// Failure of a request that never reached the streaming stage.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let ApiError::Process(e) = self;
        match e {
            ProcessError::Validation(_) | ProcessError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProcessError::NotFound(_) => StatusCode::NOT_FOUND,
            ProcessError::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            ProcessError::Store(_) | ProcessError::Responder(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let ApiError::Process(e) = &self;
        (status, Json(e.to_payload())).into_response()
    }
}
