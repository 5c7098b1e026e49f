//! Streaming session controller: decodes a request, runs it, and for
//! streaming operations drives the collaborator's events through the item
//! pipeline into SSE frames.

use bytes::Bytes;
use chatwire_contract::request::{
    AddUserMessageParams, ClientToolOutputParams, CustomActionParams, ListParams,
    RetryAfterItemParams,
};
use chatwire_contract::{
    error_codes, now_millis, ActionMode, AttachmentStore, EventStream, ItemContent, ItemKind,
    Operation, PageQuery, RequestContext, Responder, ResponderError, ResponseContext, Store,
    StoreError, Thread, ThreadItem, ThreadMetadata, ThreadStreamEvent, ToolCallStatus,
};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::codec;
use crate::config::RuntimeConfig;
use crate::error::ProcessError;
use crate::pipeline::ItemPipeline;
use crate::router::{ActionHandler, ActionRouter};

const GENERIC_ERROR_MESSAGE: &str = "An error occurred while generating a response.";
const TIMEOUT_MESSAGE: &str = "The response took too long and was stopped.";

// ============================================================================
// Results
// ============================================================================

/// Outcome of one processed request.
pub enum ProcessResult {
    Streaming(StreamingResult),
    NonStreaming(NonStreamingResult),
}

impl ProcessResult {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }
}

impl std::fmt::Debug for ProcessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streaming(_) => f.write_str("Streaming(..)"),
            Self::NonStreaming(result) => f.debug_tuple("NonStreaming").field(result).finish(),
        }
    }
}

/// Lazy sequence of encoded SSE frames. Dropping it cancels the turn.
pub struct StreamingResult {
    frames: BoxStream<'static, Bytes>,
}

impl StreamingResult {
    fn new(frames: impl Stream<Item = Bytes> + Send + 'static) -> Self {
        Self {
            frames: Box::pin(frames),
        }
    }
}

impl Stream for StreamingResult {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.frames.poll_next_unpin(cx)
    }
}

/// One JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NonStreamingResult {
    payload: Value,
}

impl NonStreamingResult {
    pub fn json(&self) -> &Value {
        &self.payload
    }

    pub fn into_json(self) -> Value {
        self.payload
    }

    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        codec::encode_json(&self.payload)
    }
}

// ============================================================================
// Controller
// ============================================================================

type TurnStart = Box<dyn FnOnce(ResponseContext) -> EventStream + Send>;

/// A streaming turn, validated and ready to run.
struct Turn {
    thread: ThreadMetadata,
    /// Events the core itself contributes before the collaborator runs.
    prelude: Vec<ThreadStreamEvent>,
    start: TurnStart,
    /// Fire-and-forget: the response ends at once and the events are only persisted.
    detached: bool,
}

enum Produced {
    Event(ThreadStreamEvent),
    Failed(ResponderError),
    Finished,
}

pub struct SessionController {
    store: Arc<dyn Store>,
    attachments: Option<Arc<dyn AttachmentStore>>,
    router: ActionRouter,
    config: RuntimeConfig,
}

impl SessionController {
    pub fn new(store: Arc<dyn Store>, responder: Arc<dyn Responder>) -> Self {
        Self {
            store,
            attachments: None,
            router: ActionRouter::new(responder),
            config: RuntimeConfig::default(),
        }
    }

    #[must_use]
    pub fn with_attachment_store(mut self, attachments: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    #[must_use]
    pub fn with_action_handler(
        mut self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        self.router = self.router.with_handler(action_type, handler);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Decode and run one request.
    ///
    /// Streaming operations return as soon as the turn is validated; the
    /// collaborator only starts once the returned stream is polled.
    pub async fn process(
        &self,
        raw: &[u8],
        ctx: RequestContext,
    ) -> Result<ProcessResult, ProcessError> {
        let span = ctx.span().clone();
        let request = match codec::decode(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!(parent: &span, path = %e.path, error = %e.message, "rejected request");
                return Err(e.into());
            }
        };

        let kind = request.kind();
        ctx.record_operation(kind.as_str());
        let ctx = ctx.with_metadata(request.metadata);
        let operation = request.operation;

        async move {
            debug!("processing request");
            let result = if kind.is_streaming() {
                self.process_streaming(operation, ctx)
                    .await
                    .map(ProcessResult::Streaming)
            } else {
                self.process_immediate(operation, ctx)
                    .await
                    .map(ProcessResult::NonStreaming)
            };
            if let Err(e) = &result {
                warn!(error = %e, "request failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    // ------------------------------------------------------------------
    // Immediate operations
    // ------------------------------------------------------------------

    async fn process_immediate(
        &self,
        operation: Operation,
        ctx: RequestContext,
    ) -> Result<NonStreamingResult, ProcessError> {
        let payload = match operation {
            Operation::CreateThread { params } => {
                let mut thread =
                    ThreadMetadata::new(self.store.generate_thread_id(&ctx), now_millis());
                thread.title = params.title;
                thread.metadata = params.metadata;
                self.store.save_thread(&thread, &ctx).await?;
                info!(thread_id = %thread.id, "thread created");
                to_payload(&Thread::empty(thread))?
            }
            Operation::GetThread { params } => {
                let thread = self.load_thread_with_items(&params.thread_id, &ctx).await?;
                to_payload(&thread)?
            }
            Operation::ListThreads { params } => {
                let page = self
                    .store
                    .list_threads(&self.page_query(&params), &ctx)
                    .await?;
                to_payload(&page)?
            }
            Operation::UpdateThread { params } => {
                let mut thread = self.store.load_thread(&params.thread_id, &ctx).await?;
                thread.title = Some(params.title);
                self.store.save_thread(&thread, &ctx).await?;
                to_payload(&thread)?
            }
            Operation::DeleteThread { params } => {
                self.store.load_thread(&params.thread_id, &ctx).await?;
                self.store.delete_thread(&params.thread_id, &ctx).await?;
                info!(thread_id = %params.thread_id, "thread deleted");
                json!({})
            }
            Operation::ListItems { params } => {
                self.store.load_thread(&params.thread_id, &ctx).await?;
                let page = self
                    .store
                    .list_items(&params.thread_id, &self.page_query(&params.page), &ctx)
                    .await?
                    .retain(|item| !item.is_hidden());
                to_payload(&page)?
            }
            Operation::Feedback { params } => {
                self.store.load_thread(&params.thread_id, &ctx).await?;
                self.router
                    .feedback(&params.thread_id, &params.item_ids, params.kind, &ctx)
                    .await?;
                json!({})
            }
            Operation::CreateAttachment { params } => {
                let attachments = self.attachment_store()?;
                let attachment = attachments.create_attachment(&params, &ctx).await?;
                self.store.save_attachment(&attachment, &ctx).await?;
                to_payload(&attachment)?
            }
            Operation::DeleteAttachment { params } => {
                let attachments = self.attachment_store()?;
                attachments
                    .delete_attachment(&params.attachment_id, &ctx)
                    .await?;
                self.store
                    .delete_attachment_metadata(&params.attachment_id, &ctx)
                    .await?;
                json!({})
            }
            streaming => {
                return Err(ProcessError::BadRequest(format!(
                    "`{}` is a streaming operation",
                    streaming.kind()
                )))
            }
        };
        Ok(NonStreamingResult { payload })
    }

    fn attachment_store(&self) -> Result<&Arc<dyn AttachmentStore>, ProcessError> {
        self.attachments
            .as_ref()
            .ok_or(ProcessError::NotConfigured("attachment store"))
    }

    fn page_query(&self, params: &ListParams) -> PageQuery {
        PageQuery::new(self.config.page_limit(params.limit), params.order)
            .after(params.after.clone())
    }

    /// Thread plus its most recent visible items, oldest first.
    async fn load_thread_with_items(
        &self,
        thread_id: &str,
        ctx: &RequestContext,
    ) -> Result<Thread, ProcessError> {
        let metadata = self.store.load_thread(thread_id, ctx).await?;
        let query = PageQuery::new(self.config.default_page_size.max(1), Default::default());
        let mut items = self
            .store
            .list_items(thread_id, &query, ctx)
            .await?
            .retain(|item| !item.is_hidden());
        items.data.reverse();
        Ok(Thread { metadata, items })
    }

    // ------------------------------------------------------------------
    // Streaming operations
    // ------------------------------------------------------------------

    async fn process_streaming(
        &self,
        operation: Operation,
        ctx: RequestContext,
    ) -> Result<StreamingResult, ProcessError> {
        let turn = match operation {
            Operation::AddUserMessage { params } => self.prepare_user_message(params, &ctx).await?,
            Operation::AddClientToolOutput { params } => {
                self.prepare_tool_output(params, &ctx).await?
            }
            Operation::RetryAfterItem { params } => self.prepare_retry(params, &ctx).await?,
            Operation::CustomAction { params } => self.prepare_action(params, &ctx).await?,
            immediate => {
                return Err(ProcessError::BadRequest(format!(
                    "`{}` is not a streaming operation",
                    immediate.kind()
                )))
            }
        };
        info!(thread_id = %turn.thread.id, detached = turn.detached, "turn started");
        Ok(self.run_turn(turn, ctx))
    }

    async fn load_open_thread(
        &self,
        thread_id: &str,
        ctx: &RequestContext,
    ) -> Result<ThreadMetadata, ProcessError> {
        let thread = self.store.load_thread(thread_id, ctx).await?;
        if !thread.status.is_active() {
            return Err(ProcessError::BadRequest(format!(
                "thread {thread_id} is not active"
            )));
        }
        Ok(thread)
    }

    async fn prepare_user_message(
        &self,
        params: AddUserMessageParams,
        ctx: &RequestContext,
    ) -> Result<Turn, ProcessError> {
        let (thread, is_new) = match &params.thread_id {
            Some(thread_id) => (self.load_open_thread(thread_id, ctx).await?, false),
            None => (
                ThreadMetadata::new(self.store.generate_thread_id(ctx), now_millis()),
                true,
            ),
        };

        let input = params.input;
        let mut attachments = Vec::with_capacity(input.attachments.len());
        for attachment_id in &input.attachments {
            attachments.push(self.store.load_attachment(attachment_id, ctx).await?);
        }

        // The thread is only written once every input reference resolved.
        let mut prelude = Vec::new();
        if is_new {
            self.store.save_thread(&thread, ctx).await?;
            info!(thread_id = %thread.id, "thread created for message");
            prelude.push(ThreadStreamEvent::ThreadCreated {
                thread: Thread::empty(thread.clone()),
            });
        }

        let message = ThreadItem::new(
            self.store.generate_item_id(ItemKind::Message, &thread, ctx),
            thread.id.clone(),
            now_millis(),
            ItemContent::UserMessage {
                content: input.content,
                attachments,
                quoted_text: input.quoted_text,
                inference_options: input.inference_options,
            },
        );
        prelude.push(ThreadStreamEvent::ItemDone {
            item: message.clone(),
        });

        let responder = self.router.responder().clone();
        Ok(Turn {
            thread,
            prelude,
            start: Box::new(move |rctx| responder.respond(rctx.thread.clone(), Some(message), rctx)),
            detached: false,
        })
    }

    async fn prepare_tool_output(
        &self,
        params: ClientToolOutputParams,
        ctx: &RequestContext,
    ) -> Result<Turn, ProcessError> {
        let thread = self.load_open_thread(&params.thread_id, ctx).await?;
        let latest = self
            .store
            .load_all_items(&thread.id, ctx)
            .await?
            .into_iter()
            .rev()
            .find(|item| !item.is_hidden());

        let mut call = match latest {
            Some(item) if item.is_pending_tool_call() => item,
            _ => {
                return Err(ProcessError::BadRequest(
                    "the latest item is not a pending client tool call".to_string(),
                ))
            }
        };
        if let ItemContent::ClientToolCall { status, output, .. } = &mut call.content {
            *status = ToolCallStatus::Completed;
            *output = Some(params.result);
        }
        self.store.replace_item(&thread.id, &call, ctx).await?;
        debug!(item_id = %call.id, "client tool call completed");

        let responder = self.router.responder().clone();
        Ok(Turn {
            thread,
            prelude: Vec::new(),
            start: Box::new(move |rctx| responder.respond(rctx.thread.clone(), None, rctx)),
            detached: false,
        })
    }

    async fn prepare_retry(
        &self,
        params: RetryAfterItemParams,
        ctx: &RequestContext,
    ) -> Result<Turn, ProcessError> {
        let thread = self.load_open_thread(&params.thread_id, ctx).await?;
        let mut items = self.store.load_all_items(&thread.id, ctx).await?;
        let position = items
            .iter()
            .position(|item| item.id == params.item_id)
            .ok_or_else(|| StoreError::item_not_found(&params.item_id))?;
        if !items[position].is_user_message() {
            return Err(ProcessError::BadRequest(format!(
                "item {} is not a user message",
                params.item_id
            )));
        }

        let later = items.split_off(position + 1);
        for item in &later {
            self.store.delete_item(&thread.id, &item.id, ctx).await?;
        }
        debug!(removed = later.len(), "cleared items after retried message");

        let message = items.swap_remove(position);
        let responder = self.router.responder().clone();
        Ok(Turn {
            thread,
            prelude: Vec::new(),
            start: Box::new(move |rctx| responder.respond(rctx.thread.clone(), Some(message), rctx)),
            detached: false,
        })
    }

    async fn prepare_action(
        &self,
        params: CustomActionParams,
        ctx: &RequestContext,
    ) -> Result<Turn, ProcessError> {
        let thread = self.load_open_thread(&params.thread_id, ctx).await?;
        let sender = match &params.item_id {
            Some(item_id) => Some(self.store.load_item(&thread.id, item_id, ctx).await?),
            None => None,
        };
        let action = params.action;
        let detached = action.mode == ActionMode::FireAndForget;
        let router = self.router.clone();
        Ok(Turn {
            thread,
            prelude: Vec::new(),
            start: Box::new(move |rctx| router.route(rctx.thread.clone(), action, sender, rctx)),
            detached,
        })
    }

    // ------------------------------------------------------------------
    // Turn execution
    // ------------------------------------------------------------------

    fn run_turn(&self, turn: Turn, ctx: RequestContext) -> StreamingResult {
        let Turn {
            thread,
            prelude,
            start,
            detached,
        } = turn;
        let store = self.store.clone();
        let buffer = self.config.event_buffer.max(1);
        let budget = self.config.turn_timeout();
        let span = ctx.span().clone();
        let cancel = CancellationToken::new();
        let guard = cancel.clone().drop_guard();

        let frames = async_stream::stream! {
            let _guard = guard;
            let deadline = budget.map(|budget| Instant::now() + budget);
            let mut pipeline = ItemPipeline::new(store.clone(), thread.id.clone(), ctx.clone());

            for event in prelude {
                let persisted = match within(deadline, pipeline.process(event)).await {
                    Some(persisted) => persisted,
                    None => {
                        warn!(parent: &span, "turn exceeded its time budget while persisting");
                        cancel.cancel();
                        yield timeout_frame(&span);
                        return;
                    }
                };
                match persisted {
                    Ok(Some(event)) => match encode_frame(&event, &span) {
                        Ok(frame) => {
                            yield frame;
                        }
                        Err(fallback) => {
                            yield fallback;
                            return;
                        }
                    },
                    Ok(None) => {}
                    Err(e) => {
                        error!(parent: &span, error = %e, "failed to persist turn prelude");
                        yield generic_error_frame();
                        return;
                    }
                }
            }

            if detached {
                let token = CancellationToken::new();
                let source = start(ResponseContext::new(thread, ctx, store, token.clone()));
                tokio::spawn(
                    drain_detached(source, pipeline, deadline, token).instrument(span.clone()),
                );
                yield done_frame(&span);
                return;
            }

            let source = start(ResponseContext::new(thread, ctx, store, cancel.clone()));
            let (tx, mut rx) = mpsc::channel(buffer);
            tokio::spawn(produce(source, tx, cancel.clone()).instrument(span.clone()));

            loop {
                let next = match within(deadline, rx.recv()).await {
                    Some(next) => next,
                    None => {
                        warn!(parent: &span, "turn exceeded its time budget");
                        cancel.cancel();
                        yield timeout_frame(&span);
                        return;
                    }
                };

                let event = match next {
                    Some(Produced::Event(event)) => event,
                    Some(Produced::Failed(err)) => {
                        cancel.cancel();
                        yield failure_frame(err, &span);
                        return;
                    }
                    Some(Produced::Finished) => {
                        debug!(parent: &span, "turn finished");
                        yield done_frame(&span);
                        return;
                    }
                    None => {
                        error!(parent: &span, "response producer stopped without finishing");
                        yield generic_error_frame();
                        return;
                    }
                };

                if cancel.is_cancelled() {
                    return;
                }
                let terminal = event.is_terminal();
                let persisted = match within(deadline, pipeline.process(event)).await {
                    Some(persisted) => persisted,
                    None => {
                        warn!(parent: &span, "turn exceeded its time budget while persisting");
                        cancel.cancel();
                        yield timeout_frame(&span);
                        return;
                    }
                };
                match persisted {
                    Ok(Some(event)) => match encode_frame(&event, &span) {
                        Ok(frame) => {
                            yield frame;
                        }
                        Err(fallback) => {
                            cancel.cancel();
                            yield fallback;
                            return;
                        }
                    },
                    Ok(None) => {}
                    Err(e) => {
                        error!(parent: &span, error = %e, "failed to persist stream event");
                        cancel.cancel();
                        yield generic_error_frame();
                        return;
                    }
                }
                if terminal {
                    cancel.cancel();
                    return;
                }
            }
        };

        StreamingResult::new(frames)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("router", &self.router)
            .field("attachments", &self.attachments.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Pull events from the collaborator into the bounded queue until the
/// sequence ends, fails, or the turn is cancelled.
async fn produce(mut source: EventStream, tx: mpsc::Sender<Produced>, cancel: CancellationToken) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("turn cancelled, dropping response stream");
                return;
            }
            next = source.next() => next,
        };
        let (message, last) = match next {
            Some(Ok(event)) => (Produced::Event(event), false),
            Some(Err(err)) => (Produced::Failed(err), true),
            None => (Produced::Finished, true),
        };
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = tx.send(message) => sent,
        };
        if sent.is_err() || last {
            return;
        }
    }
}

/// Persist a fire-and-forget turn in the background. Nothing is emitted.
async fn drain_detached(
    mut source: EventStream,
    mut pipeline: ItemPipeline,
    deadline: Option<Instant>,
    cancel: CancellationToken,
) {
    let _guard = cancel.drop_guard();
    loop {
        let Some(next) = within(deadline, source.next()).await else {
            warn!("detached turn exceeded its time budget");
            return;
        };
        match next {
            Some(Ok(event)) => {
                let terminal = event.is_terminal();
                let Some(persisted) = within(deadline, pipeline.process(event)).await else {
                    warn!("detached turn exceeded its time budget while persisting");
                    return;
                };
                if let Err(e) = persisted {
                    error!(error = %e, "failed to persist detached event");
                    return;
                }
                if terminal {
                    return;
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "detached turn failed");
                return;
            }
            None => {
                debug!("detached turn finished");
                return;
            }
        }
    }
}

/// Await `fut` against the turn deadline; `None` once the budget is spent.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, ProcessError> {
    serde_json::to_value(value).map_err(|e| ProcessError::Store(StoreError::from(e)))
}

/// Encode one event, or hand back the generic error frame that must end the
/// stream instead.
fn encode_frame(event: &ThreadStreamEvent, span: &Span) -> Result<Bytes, Bytes> {
    codec::encode_event(event).map_err(|e| {
        error!(parent: span, error = %e, event = event.name(), "failed to encode stream event");
        generic_error_frame()
    })
}

fn generic_error_frame() -> Bytes {
    let event = ThreadStreamEvent::error(error_codes::STREAM_ERROR, GENERIC_ERROR_MESSAGE, true);
    codec::encode_event(&event).unwrap_or_else(|_| {
        Bytes::from_static(b"data: {\"type\":\"error\",\"code\":\"stream.error\",\"allow_retry\":true}\n\n")
    })
}

fn done_frame(span: &Span) -> Bytes {
    encode_frame(&ThreadStreamEvent::Done, span).unwrap_or_else(|fallback| fallback)
}

fn timeout_frame(span: &Span) -> Bytes {
    let event = ThreadStreamEvent::error(error_codes::STREAM_TIMEOUT, TIMEOUT_MESSAGE, true);
    encode_frame(&event, span).unwrap_or_else(|fallback| fallback)
}

fn failure_frame(err: ResponderError, span: &Span) -> Bytes {
    match err {
        ResponderError::Stream {
            code,
            message,
            allow_retry,
        } => {
            warn!(parent: span, code = %code, "responder reported an error");
            let event = ThreadStreamEvent::error(code, message, allow_retry);
            encode_frame(&event, span).unwrap_or_else(|fallback| fallback)
        }
        ResponderError::Internal(detail) => {
            error!(parent: span, error = %detail, "responder failed");
            generic_error_frame()
        }
    }
}
