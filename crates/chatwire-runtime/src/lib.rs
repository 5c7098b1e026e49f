//! Protocol runtime for chatwire.
//!
//! [`SessionController::process`] is the single entry point: it decodes one
//! request with the [`codec`], answers immediate operations with a JSON
//! payload, and runs streaming operations as a turn whose events are
//! persisted by the [`ItemPipeline`] before being encoded as SSE frames.
//! Widget actions are dispatched by the [`ActionRouter`].

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod helpers;
pub mod pipeline;
pub mod router;
pub mod schema;

pub use config::RuntimeConfig;
pub use controller::{NonStreamingResult, ProcessResult, SessionController, StreamingResult};
pub use error::{PipelineError, ProcessError, ValidationError};
pub use helpers::{stream_assistant_text, stream_widget};
pub use pipeline::ItemPipeline;
pub use router::{ActionHandler, ActionRouter};
