//! HTTP binding of the chatwire endpoint.
//!
//! One `POST /chatkit` route accepts every operation. Streaming operations
//! answer with `text/event-stream`, everything else with a JSON document.

pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod sse;

pub use config::Config;
pub use error::ApiError;
pub use http::{routes, AppState};
