use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::action::{Action, FeedbackKind};
use crate::context::RequestContext;
use crate::event::{error_codes, ThreadStreamEvent};
use crate::ids::now_millis;
use crate::item::{ItemContent, ItemKind, ThreadItem};
use crate::storage::Store;
use crate::thread::ThreadMetadata;

/// Lazy event sequence produced by a collaborator for one turn.
pub type EventStream = BoxStream<'static, Result<ThreadStreamEvent, ResponderError>>;

#[derive(Debug, Clone, Error)]
pub enum ResponderError {
    /// Forwarded to the client verbatim as an `error` event.
    #[error("{message}")]
    Stream {
        code: String,
        message: String,
        allow_retry: bool,
    },

    /// Logged, then replaced with a generic retryable `error` event.
    #[error("responder failure: {0}")]
    Internal(String),
}

impl ResponderError {
    pub fn stream(code: impl Into<String>, message: impl Into<String>, allow_retry: bool) -> Self {
        Self::Stream {
            code: code.into(),
            message: message.into(),
            allow_retry,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// What a collaborator gets to work with while producing a turn.
#[derive(Clone)]
pub struct ResponseContext {
    pub thread: ThreadMetadata,
    pub request: RequestContext,
    pub store: Arc<dyn Store>,
    cancellation: CancellationToken,
}

impl ResponseContext {
    pub fn new(
        thread: ThreadMetadata,
        request: RequestContext,
        store: Arc<dyn Store>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            thread,
            request,
            store,
            cancellation,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread.id
    }

    pub fn generate_item_id(&self, kind: ItemKind) -> String {
        self.store.generate_item_id(kind, &self.thread, &self.request)
    }

    /// A new item of this thread stamped with the current time.
    pub fn new_item(&self, content: ItemContent) -> ThreadItem {
        ThreadItem::new(
            self.generate_item_id(content.kind()),
            self.thread.id.clone(),
            now_millis(),
            content,
        )
    }

    /// Cancelled when the client disconnects, the turn times out or a
    /// terminal event has been emitted.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl std::fmt::Debug for ResponseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseContext")
            .field("thread", &self.thread.id)
            .field("request", &self.request.request_id())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

/// The application collaborator that produces assistant turns.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce the events of one turn. `input` is the user message the turn
    /// answers, absent when resuming after a client tool call.
    fn respond(
        &self,
        thread: ThreadMetadata,
        input: Option<ThreadItem>,
        ctx: ResponseContext,
    ) -> EventStream;

    /// Handle a widget action no registered handler claimed.
    fn action(
        &self,
        _thread: ThreadMetadata,
        action: Action,
        _sender: Option<ThreadItem>,
        _ctx: ResponseContext,
    ) -> EventStream {
        let message = format!("action `{}` is not supported", action.kind);
        Box::pin(futures::stream::once(async move {
            Err(ResponderError::stream(error_codes::CUSTOM, message, false))
        }))
    }

    /// Record user feedback on items. Ignored unless overridden.
    async fn add_feedback(
        &self,
        _thread_id: &str,
        _item_ids: &[String],
        _kind: FeedbackKind,
        _ctx: &RequestContext,
    ) -> Result<(), ResponderError> {
        Ok(())
    }
}
