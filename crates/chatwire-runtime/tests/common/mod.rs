#![allow(dead_code)]

use async_trait::async_trait;
use chatwire_contract::{
    Attachment, EventStream, FeedbackKind, ItemContent, ItemKind, Page, PageQuery,
    RequestContext, Responder, ResponderError, ResponseContext, Store, StoreError, ThreadItem,
    ThreadMetadata,
};
use chatwire_runtime::{ProcessResult, SessionController};
use chatwire_store_adapters::MemoryStore;
use futures::StreamExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn ctx() -> RequestContext {
    RequestContext::new("req_test")
}

pub fn body(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

/// Parse one `data: <json>\n\n` frame.
pub fn parse_frame(frame: &[u8]) -> Value {
    let text = std::str::from_utf8(frame).unwrap();
    let json = text
        .strip_prefix("data: ")
        .and_then(|rest| rest.strip_suffix("\n\n"))
        .unwrap_or_else(|| panic!("not an SSE frame: {text:?}"));
    serde_json::from_str(json).unwrap()
}

pub async fn collect_frames(result: ProcessResult) -> Vec<Value> {
    match result {
        ProcessResult::Streaming(stream) => stream.map(|frame| parse_frame(&frame)).collect().await,
        ProcessResult::NonStreaming(payload) => panic!("expected a stream, got {payload:?}"),
    }
}

pub fn immediate(result: ProcessResult) -> Value {
    match result {
        ProcessResult::NonStreaming(payload) => payload.into_json(),
        ProcessResult::Streaming(_) => panic!("expected an immediate payload"),
    }
}

pub fn frame_types(frames: &[Value]) -> Vec<String> {
    frames
        .iter()
        .map(|f| f["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn assistant(ctx: &ResponseContext, id: &str, text: &str) -> ThreadItem {
    ThreadItem::assistant_text(id, ctx.thread_id(), 1, text)
}

pub fn hidden(ctx: &ResponseContext, id: &str) -> ThreadItem {
    ThreadItem::hidden_context(id, ctx.thread_id(), 1, serde_json::json!({"secret": id}))
}

pub async fn seed_thread(store: &dyn Store, thread_id: &str) {
    store
        .save_thread(&ThreadMetadata::new(thread_id, 1), &ctx())
        .await
        .unwrap();
}

pub async fn seed_item(store: &dyn Store, item: ThreadItem) {
    store
        .create_item(&item.thread_id.clone(), &item, &ctx())
        .await
        .unwrap();
}

pub fn pending_tool_call(thread_id: &str, id: &str) -> ThreadItem {
    ThreadItem::new(
        id,
        thread_id,
        1,
        ItemContent::ClientToolCall {
            status: Default::default(),
            call_id: format!("call_{id}"),
            name: "get_location".into(),
            arguments: BTreeMap::new(),
            output: None,
        },
    )
}

// ============================================================================
// Scripted responder
// ============================================================================

type Script = dyn Fn(ResponseContext, Option<ThreadItem>) -> EventStream + Send + Sync;

/// Responder driven by a closure, recording how it was called.
pub struct ScriptedResponder {
    script: Box<Script>,
    pub calls: AtomicUsize,
    pub tokens: Mutex<Vec<CancellationToken>>,
    pub inputs: Mutex<Vec<Option<ThreadItem>>>,
    pub metadata: Mutex<Vec<BTreeMap<String, Value>>>,
    pub feedback: Mutex<Vec<(String, Vec<String>, FeedbackKind)>>,
}

impl ScriptedResponder {
    pub fn new(
        script: impl Fn(ResponseContext, Option<ThreadItem>) -> EventStream + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
            metadata: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> CancellationToken {
        self.tokens.lock().unwrap().last().cloned().expect("responder was not called")
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    fn respond(
        &self,
        _thread: ThreadMetadata,
        input: Option<ThreadItem>,
        ctx: ResponseContext,
    ) -> EventStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .push(ctx.cancellation_token().clone());
        self.inputs.lock().unwrap().push(input.clone());
        self.metadata
            .lock()
            .unwrap()
            .push(ctx.request.metadata().clone());
        (self.script)(ctx, input)
    }

    async fn add_feedback(
        &self,
        thread_id: &str,
        item_ids: &[String],
        kind: FeedbackKind,
        _ctx: &RequestContext,
    ) -> Result<(), ResponderError> {
        self.feedback
            .lock()
            .unwrap()
            .push((thread_id.to_string(), item_ids.to_vec(), kind));
        Ok(())
    }
}

// ============================================================================
// Recording store
// ============================================================================

/// Memory store that logs every write and can be told to fail or hang on
/// one item.
pub struct RecordingStore {
    inner: MemoryStore,
    pub log: Log,
    fail_item: Mutex<Option<String>>,
    stall_item: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new(log: Log) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            log,
            fail_item: Mutex::new(None),
            stall_item: Mutex::new(None),
        })
    }

    pub fn fail_on_item(&self, item_id: &str) {
        *self.fail_item.lock().unwrap() = Some(item_id.to_string());
    }

    /// Make `create_item` for `item_id` never complete.
    pub fn stall_on_item(&self, item_id: &str) {
        *self.stall_item.lock().unwrap() = Some(item_id.to_string());
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Store for RecordingStore {
    fn generate_item_id(&self, kind: ItemKind, thread: &ThreadMetadata, ctx: &RequestContext) -> String {
        self.inner.generate_item_id(kind, thread, ctx)
    }

    async fn load_thread(&self, thread_id: &str, ctx: &RequestContext) -> Result<ThreadMetadata, StoreError> {
        self.inner.load_thread(thread_id, ctx).await
    }

    async fn save_thread(&self, thread: &ThreadMetadata, ctx: &RequestContext) -> Result<(), StoreError> {
        self.record(format!("save_thread:{}", thread.id));
        self.inner.save_thread(thread, ctx).await
    }

    async fn delete_thread(&self, thread_id: &str, ctx: &RequestContext) -> Result<(), StoreError> {
        self.record(format!("delete_thread:{thread_id}"));
        self.inner.delete_thread(thread_id, ctx).await
    }

    async fn list_threads(&self, query: &PageQuery, ctx: &RequestContext) -> Result<Page<ThreadMetadata>, StoreError> {
        self.inner.list_threads(query, ctx).await
    }

    async fn list_items(
        &self,
        thread_id: &str,
        query: &PageQuery,
        ctx: &RequestContext,
    ) -> Result<Page<ThreadItem>, StoreError> {
        self.inner.list_items(thread_id, query, ctx).await
    }

    async fn create_item(&self, thread_id: &str, item: &ThreadItem, ctx: &RequestContext) -> Result<(), StoreError> {
        if self.fail_item.lock().unwrap().as_deref() == Some(item.id.as_str()) {
            return Err(StoreError::Backend("disk full".into()));
        }
        let stalled = self.stall_item.lock().unwrap().as_deref() == Some(item.id.as_str());
        if stalled {
            std::future::pending::<()>().await;
        }
        self.record(format!("create:{}", item.id));
        self.inner.create_item(thread_id, item, ctx).await
    }

    async fn replace_item(&self, thread_id: &str, item: &ThreadItem, ctx: &RequestContext) -> Result<(), StoreError> {
        self.record(format!("replace:{}", item.id));
        self.inner.replace_item(thread_id, item, ctx).await
    }

    async fn load_item(&self, thread_id: &str, item_id: &str, ctx: &RequestContext) -> Result<ThreadItem, StoreError> {
        self.inner.load_item(thread_id, item_id, ctx).await
    }

    async fn delete_item(&self, thread_id: &str, item_id: &str, ctx: &RequestContext) -> Result<(), StoreError> {
        self.record(format!("delete:{item_id}"));
        self.inner.delete_item(thread_id, item_id, ctx).await
    }

    async fn save_attachment(&self, attachment: &Attachment, ctx: &RequestContext) -> Result<(), StoreError> {
        self.inner.save_attachment(attachment, ctx).await
    }

    async fn load_attachment(&self, attachment_id: &str, ctx: &RequestContext) -> Result<Attachment, StoreError> {
        self.inner.load_attachment(attachment_id, ctx).await
    }

    async fn delete_attachment_metadata(&self, attachment_id: &str, ctx: &RequestContext) -> Result<(), StoreError> {
        self.inner.delete_attachment_metadata(attachment_id, ctx).await
    }
}

pub fn controller(store: Arc<dyn Store>, responder: Arc<ScriptedResponder>) -> SessionController {
    SessionController::new(store, responder)
}
