use async_trait::async_trait;
use thiserror::Error;

use crate::context::RequestContext;
use crate::ids::generate_id;
use crate::item::{Attachment, ItemKind, ThreadItem};
use crate::request::CreateAttachmentParams;
use crate::thread::{paginate, Page, PageQuery, SortOrder, ThreadMetadata};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Thread, item or attachment not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Entry already exists (for create operations).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Invalid id (empty, control chars, etc.).
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn thread_not_found(thread_id: &str) -> Self {
        Self::NotFound(format!("thread {thread_id}"))
    }

    pub fn item_not_found(item_id: &str) -> Self {
        Self::NotFound(format!("item {item_id}"))
    }

    pub fn attachment_not_found(attachment_id: &str) -> Self {
        Self::NotFound(format!("attachment {attachment_id}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Reject ids that cannot be safely used as storage keys.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() {
        return Err(StoreError::InvalidId("id cannot be empty".to_string()));
    }
    if id.chars().any(|c| c.is_control()) {
        return Err(StoreError::InvalidId(format!(
            "id contains control characters: {id:?}"
        )));
    }
    Ok(())
}

/// Paginate threads by creation time, ties broken by id.
pub fn paginate_threads(mut threads: Vec<ThreadMetadata>, query: &PageQuery) -> Page<ThreadMetadata> {
    threads.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    paginate(&threads, |thread| thread.id.as_str(), query)
}

/// Storage collaborator for threads, items and attachment metadata.
///
/// Every write is individually atomic. Items of a thread are kept in
/// insertion order, which is also their `asc` listing order.
#[async_trait]
pub trait Store: Send + Sync {
    fn generate_thread_id(&self, _ctx: &RequestContext) -> String {
        generate_id(ItemKind::Thread.prefix())
    }

    fn generate_item_id(
        &self,
        kind: ItemKind,
        _thread: &ThreadMetadata,
        _ctx: &RequestContext,
    ) -> String {
        generate_id(kind.prefix())
    }

    async fn load_thread(
        &self,
        thread_id: &str,
        ctx: &RequestContext,
    ) -> Result<ThreadMetadata, StoreError>;

    /// Create or overwrite thread metadata.
    async fn save_thread(
        &self,
        thread: &ThreadMetadata,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;

    /// Delete a thread and all of its items.
    async fn delete_thread(&self, thread_id: &str, ctx: &RequestContext) -> Result<(), StoreError>;

    async fn list_threads(
        &self,
        query: &PageQuery,
        ctx: &RequestContext,
    ) -> Result<Page<ThreadMetadata>, StoreError>;

    /// List stored items, hidden ones included.
    async fn list_items(
        &self,
        thread_id: &str,
        query: &PageQuery,
        ctx: &RequestContext,
    ) -> Result<Page<ThreadItem>, StoreError>;

    /// Append an item. `AlreadyExists` if the id is taken.
    async fn create_item(
        &self,
        thread_id: &str,
        item: &ThreadItem,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;

    /// Replace an item in place. Appends when the id is unknown.
    async fn replace_item(
        &self,
        thread_id: &str,
        item: &ThreadItem,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;

    async fn load_item(
        &self,
        thread_id: &str,
        item_id: &str,
        ctx: &RequestContext,
    ) -> Result<ThreadItem, StoreError>;

    async fn delete_item(
        &self,
        thread_id: &str,
        item_id: &str,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;

    async fn save_attachment(
        &self,
        attachment: &Attachment,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;

    async fn load_attachment(
        &self,
        attachment_id: &str,
        ctx: &RequestContext,
    ) -> Result<Attachment, StoreError>;

    async fn delete_attachment_metadata(
        &self,
        attachment_id: &str,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;

    /// Most recent item of a thread. Convenience wrapper.
    async fn latest_item(
        &self,
        thread_id: &str,
        ctx: &RequestContext,
    ) -> Result<Option<ThreadItem>, StoreError> {
        let page = self
            .list_items(thread_id, &PageQuery::new(1, SortOrder::Desc), ctx)
            .await?;
        Ok(page.data.into_iter().next())
    }

    /// Every stored item of a thread, oldest first. Convenience wrapper.
    async fn load_all_items(
        &self,
        thread_id: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<ThreadItem>, StoreError> {
        let mut items = Vec::new();
        let mut query = PageQuery::new(200, SortOrder::Asc);
        loop {
            let page = self.list_items(thread_id, &query, ctx).await?;
            items.extend(page.data);
            if !page.has_more {
                return Ok(items);
            }
            query = query.after(page.after);
        }
    }
}

/// Blob side of attachments: issues upload targets and deletes content.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    fn generate_attachment_id(&self, _ctx: &RequestContext) -> String {
        generate_id(ItemKind::Attachment.prefix())
    }

    async fn create_attachment(
        &self,
        params: &CreateAttachmentParams,
        ctx: &RequestContext,
    ) -> Result<Attachment, StoreError>;

    async fn delete_attachment(
        &self,
        attachment_id: &str,
        ctx: &RequestContext,
    ) -> Result<(), StoreError>;
}
