//! Action router: dispatches widget actions to registered handlers.

use chatwire_contract::{
    Action, EventStream, FeedbackKind, RequestContext, Responder, ResponderError, ResponseContext,
    ThreadItem, ThreadMetadata,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Handles one kind of widget action.
pub trait ActionHandler: Send + Sync {
    fn handle(
        &self,
        thread: ThreadMetadata,
        action: Action,
        sender: Option<ThreadItem>,
        ctx: ResponseContext,
    ) -> EventStream;
}

/// Looks handlers up by action type, falling back to the responder.
///
/// Pure dispatch. Routing never touches storage or the client stream.
#[derive(Clone)]
pub struct ActionRouter {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
    responder: Arc<dyn Responder>,
}

impl ActionRouter {
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self {
            handlers: HashMap::new(),
            responder,
        }
    }

    /// Register `handler` for `action_type`, replacing any previous one.
    #[must_use]
    pub fn with_handler(
        mut self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        self.handlers.insert(action_type.into(), handler);
        self
    }

    pub fn has_handler(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    pub fn responder(&self) -> &Arc<dyn Responder> {
        &self.responder
    }

    pub fn route(
        &self,
        thread: ThreadMetadata,
        action: Action,
        sender: Option<ThreadItem>,
        ctx: ResponseContext,
    ) -> EventStream {
        match self.handlers.get(&action.kind) {
            Some(handler) => {
                debug!(action = %action.kind, "routing action to registered handler");
                handler.handle(thread, action, sender, ctx)
            }
            None => {
                debug!(action = %action.kind, "routing action to responder");
                self.responder.action(thread, action, sender, ctx)
            }
        }
    }

    pub async fn feedback(
        &self,
        thread_id: &str,
        item_ids: &[String],
        kind: FeedbackKind,
        ctx: &RequestContext,
    ) -> Result<(), ResponderError> {
        self.responder
            .add_feedback(thread_id, item_ids, kind, ctx)
            .await
    }
}

impl std::fmt::Debug for ActionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ActionRouter").field("handlers", &kinds).finish()
    }
}
