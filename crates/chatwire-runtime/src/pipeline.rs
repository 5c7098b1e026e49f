//! Thread item pipeline: persists stream events and filters what the client
//! may see.

use chatwire_contract::{RequestContext, Store, StoreError, ThreadItem, ThreadStreamEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::PipelineError;

/// Persists the events of one turn, in order, before they are forwarded.
///
/// Returns `None` for events the client must not see: hidden-context items
/// and anything addressed to one.
pub struct ItemPipeline {
    store: Arc<dyn Store>,
    thread_id: String,
    ctx: RequestContext,
    hidden: HashSet<String>,
}

impl ItemPipeline {
    pub fn new(store: Arc<dyn Store>, thread_id: impl Into<String>, ctx: RequestContext) -> Self {
        Self {
            store,
            thread_id: thread_id.into(),
            ctx,
            hidden: HashSet::new(),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub async fn process(
        &mut self,
        event: ThreadStreamEvent,
    ) -> Result<Option<ThreadStreamEvent>, PipelineError> {
        match &event {
            ThreadStreamEvent::ItemDone { item } => {
                self.store
                    .create_item(&self.thread_id, item, &self.ctx)
                    .await?;
                if self.track_hidden(item) {
                    return Ok(None);
                }
            }
            ThreadStreamEvent::ItemReplaced { item } => {
                self.store
                    .replace_item(&self.thread_id, item, &self.ctx)
                    .await?;
                if self.track_hidden(item) {
                    return Ok(None);
                }
            }
            ThreadStreamEvent::ItemRemoved { item_id } => {
                let hidden = self.is_hidden(item_id).await?;
                self.store
                    .delete_item(&self.thread_id, item_id, &self.ctx)
                    .await?;
                if hidden {
                    self.hidden.remove(item_id);
                    return Ok(None);
                }
            }
            ThreadStreamEvent::ItemAdded { item } => {
                if self.track_hidden(item) {
                    return Ok(None);
                }
            }
            ThreadStreamEvent::ThreadUpdated { thread } => {
                self.store.save_thread(&thread.metadata, &self.ctx).await?;
            }
            other => {
                if let Some(item_id) = other.item_id() {
                    if self.hidden.contains(item_id) {
                        debug!(item_id, event = other.name(), "dropping update of hidden item");
                        return Ok(None);
                    }
                }
            }
        }
        Ok(Some(event))
    }

    fn track_hidden(&mut self, item: &ThreadItem) -> bool {
        if item.is_hidden() {
            self.hidden.insert(item.id.clone());
            true
        } else {
            false
        }
    }

    /// Hidden items of earlier turns are only known to the store.
    async fn is_hidden(&self, item_id: &str) -> Result<bool, StoreError> {
        if self.hidden.contains(item_id) {
            return Ok(true);
        }
        match self
            .store
            .load_item(&self.thread_id, item_id, &self.ctx)
            .await
        {
            Ok(item) => Ok(item.is_hidden()),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
