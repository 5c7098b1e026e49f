#![allow(dead_code)]

use axum::body::to_bytes;
use axum::http::{HeaderMap, Request, StatusCode};
use chatwire_contract::{Store, ThreadItem, ThreadMetadata};
use chatwire_runtime::SessionController;
use chatwire_server::demo::{CounterHandler, EchoResponder, COUNTER_INCREMENT};
use chatwire_server::{http, AppState};
use chatwire_store_adapters::{MemoryAttachmentStore, MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn make_app(store: Arc<MemoryStore>) -> axum::Router {
    let controller = SessionController::new(store, Arc::new(EchoResponder))
        .with_attachment_store(Arc::new(MemoryAttachmentStore::new()))
        .with_action_handler(COUNTER_INCREMENT, Arc::new(CounterHandler));
    axum::Router::new()
        .merge(http::routes())
        .with_state(AppState::new(controller))
}

/// Send a POST request and return `(status, headers, body_text)`.
pub async fn post_json(
    app: axum::Router,
    payload: Value,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, String) {
    let mut request = Request::builder()
        .method("POST")
        .uri(http::CHATKIT_PATH)
        .header("content-type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let resp = app
        .oneshot(
            request
                .body(axum::body::Body::from(payload.to_string()))
                .expect("request build should succeed"),
        )
        .await
        .expect("app should handle request");

    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let text = String::from_utf8(body.to_vec()).expect("response body must be utf-8");
    (status, headers, text)
}

/// Send a GET request and return the status.
pub async fn get_status(app: axum::Router, uri: &str) -> StatusCode {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(axum::body::Body::empty())
            .expect("request build should succeed"),
    )
    .await
    .expect("app should handle request")
    .status()
}

pub fn sse_events(sse: &str) -> Vec<Value> {
    sse.lines()
        .filter(|l| l.starts_with("data: "))
        .filter_map(|l| serde_json::from_str::<Value>(&l[6..]).ok())
        .collect()
}

pub fn event_types(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| e.get("type").and_then(|t| t.as_str()))
        .collect()
}

pub async fn seed_thread(store: &MemoryStore, thread_id: &str) {
    let ctx = chatwire_contract::RequestContext::new("req_seed");
    store
        .save_thread(&ThreadMetadata::new(thread_id, 1), &ctx)
        .await
        .expect("seed thread");
}

pub async fn seed_item(store: &MemoryStore, item: ThreadItem) {
    let ctx = chatwire_contract::RequestContext::new("req_seed");
    let thread_id = item.thread_id.clone();
    store
        .create_item(&thread_id, &item, &ctx)
        .await
        .expect("seed item");
}
