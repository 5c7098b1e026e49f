use async_trait::async_trait;
use chatwire_contract::request::CreateAttachmentParams;
use chatwire_contract::storage::{paginate_threads, validate_id};
use chatwire_contract::thread::paginate;
use chatwire_contract::{
    Attachment, AttachmentKind, AttachmentStore, Page, PageQuery, RequestContext, Store,
    StoreError, ThreadItem, ThreadMetadata,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

struct ThreadEntry {
    metadata: ThreadMetadata,
    /// Insertion order.
    items: Vec<ThreadItem>,
}

/// In-memory storage for testing and local development.
#[derive(Default)]
pub struct MemoryStore {
    threads: RwLock<HashMap<String, ThreadEntry>>,
    attachments: RwLock<HashMap<String, Attachment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_thread(
        &self,
        thread_id: &str,
        _ctx: &RequestContext,
    ) -> Result<ThreadMetadata, StoreError> {
        let threads = self.threads.read().await;
        threads
            .get(thread_id)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| StoreError::thread_not_found(thread_id))
    }

    async fn save_thread(
        &self,
        thread: &ThreadMetadata,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        validate_id(&thread.id)?;
        let mut threads = self.threads.write().await;
        match threads.get_mut(&thread.id) {
            Some(entry) => entry.metadata = thread.clone(),
            None => {
                threads.insert(
                    thread.id.clone(),
                    ThreadEntry {
                        metadata: thread.clone(),
                        items: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str, _ctx: &RequestContext) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        threads.remove(thread_id);
        Ok(())
    }

    async fn list_threads(
        &self,
        query: &PageQuery,
        _ctx: &RequestContext,
    ) -> Result<Page<ThreadMetadata>, StoreError> {
        let threads = self.threads.read().await;
        let all: Vec<ThreadMetadata> = threads.values().map(|e| e.metadata.clone()).collect();
        Ok(paginate_threads(all, query))
    }

    async fn list_items(
        &self,
        thread_id: &str,
        query: &PageQuery,
        _ctx: &RequestContext,
    ) -> Result<Page<ThreadItem>, StoreError> {
        let threads = self.threads.read().await;
        let entry = threads
            .get(thread_id)
            .ok_or_else(|| StoreError::thread_not_found(thread_id))?;
        Ok(paginate(&entry.items, |item| item.id.as_str(), query))
    }

    async fn create_item(
        &self,
        thread_id: &str,
        item: &ThreadItem,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        validate_id(&item.id)?;
        let mut threads = self.threads.write().await;
        let entry = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::thread_not_found(thread_id))?;
        if entry.items.iter().any(|existing| existing.id == item.id) {
            return Err(StoreError::AlreadyExists(format!("item {}", item.id)));
        }
        entry.items.push(item.clone());
        debug!(thread_id, item_id = %item.id, "item stored");
        Ok(())
    }

    async fn replace_item(
        &self,
        thread_id: &str,
        item: &ThreadItem,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        validate_id(&item.id)?;
        let mut threads = self.threads.write().await;
        let entry = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::thread_not_found(thread_id))?;
        match entry.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => entry.items.push(item.clone()),
        }
        Ok(())
    }

    async fn load_item(
        &self,
        thread_id: &str,
        item_id: &str,
        _ctx: &RequestContext,
    ) -> Result<ThreadItem, StoreError> {
        let threads = self.threads.read().await;
        let entry = threads
            .get(thread_id)
            .ok_or_else(|| StoreError::thread_not_found(thread_id))?;
        entry
            .items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or_else(|| StoreError::item_not_found(item_id))
    }

    async fn delete_item(
        &self,
        thread_id: &str,
        item_id: &str,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        let entry = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::thread_not_found(thread_id))?;
        entry.items.retain(|item| item.id != item_id);
        Ok(())
    }

    async fn save_attachment(
        &self,
        attachment: &Attachment,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        validate_id(&attachment.id)?;
        let mut attachments = self.attachments.write().await;
        attachments.insert(attachment.id.clone(), attachment.clone());
        Ok(())
    }

    async fn load_attachment(
        &self,
        attachment_id: &str,
        _ctx: &RequestContext,
    ) -> Result<Attachment, StoreError> {
        let attachments = self.attachments.read().await;
        attachments
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| StoreError::attachment_not_found(attachment_id))
    }

    async fn delete_attachment_metadata(
        &self,
        attachment_id: &str,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        let mut attachments = self.attachments.write().await;
        attachments.remove(attachment_id);
        Ok(())
    }
}

/// In-memory attachment blobs. Issues `memory://` upload targets.
#[derive(Default)]
pub struct MemoryAttachmentStore {
    ids: RwLock<HashSet<String>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, attachment_id: &str) -> bool {
        self.ids.read().await.contains(attachment_id)
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn create_attachment(
        &self,
        params: &CreateAttachmentParams,
        ctx: &RequestContext,
    ) -> Result<Attachment, StoreError> {
        let id = self.generate_attachment_id(ctx);
        let upload_url = format!("memory://uploads/{id}");
        let kind = if params.mime_type.starts_with("image/") {
            AttachmentKind::Image {
                preview_url: format!("memory://previews/{id}"),
            }
        } else {
            AttachmentKind::File
        };
        self.ids.write().await.insert(id.clone());
        Ok(Attachment {
            id,
            name: params.name.clone(),
            mime_type: params.mime_type.clone(),
            upload_url: Some(upload_url),
            kind,
        })
    }

    async fn delete_attachment(
        &self,
        attachment_id: &str,
        _ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        if self.ids.write().await.remove(attachment_id) {
            Ok(())
        } else {
            Err(StoreError::attachment_not_found(attachment_id))
        }
    }
}
