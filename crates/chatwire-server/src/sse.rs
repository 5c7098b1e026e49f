use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chatwire_runtime::StreamingResult;
use futures::StreamExt;
use std::convert::Infallible;

/// Frames of a streaming turn as an infallible body stream.
///
/// Dropping the body (client disconnect) drops the turn, which cancels it.
pub fn sse_body_stream(
    frames: StreamingResult,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    frames.map(Ok::<Bytes, Infallible>)
}

pub fn sse_response<S>(stream: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}
