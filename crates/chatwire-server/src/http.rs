use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chatwire_contract::RequestContext;
use chatwire_runtime::{ProcessResult, SessionController};
use std::sync::Arc;

use crate::error::ApiError;
use crate::sse::{sse_body_stream, sse_response};

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// The single protocol endpoint.
pub const CHATKIT_PATH: &str = "/chatkit";

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
}

impl AppState {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }
}

/// Build health and protocol routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(CHATKIT_PATH, post(chatkit))
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn chatkit(
    State(st): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = request_context(&headers);
    match st.controller.process(&body, ctx).await? {
        ProcessResult::Streaming(frames) => Ok(sse_response(sse_body_stream(frames))),
        ProcessResult::NonStreaming(result) => Ok(Json(result.into_json()).into_response()),
    }
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let ctx = match header_str(headers, REQUEST_ID_HEADER) {
        Some(request_id) => RequestContext::new(request_id),
        None => RequestContext::generated(),
    };
    match header_str(headers, USER_ID_HEADER) {
        Some(user_id) => ctx.with_user(user_id),
        None => ctx,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
