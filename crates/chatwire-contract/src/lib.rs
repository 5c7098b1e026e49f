//! Shared contracts for the chatwire protocol core: thread and item model,
//! stream events, the closed operation set, and the storage and responder
//! interfaces the core depends on but does not implement.

pub mod action;
pub mod context;
pub mod event;
pub mod ids;
pub mod item;
pub mod request;
pub mod responder;
pub mod storage;
pub mod thread;

pub use chatwire_widget::{WidgetNode, WidgetPatch};

// thread
pub use thread::{Page, PageQuery, SortOrder, Thread, ThreadMetadata, ThreadStatus};

// item
pub use item::{
    Annotation, AssistantContent, Attachment, AttachmentKind, InferenceOptions, ItemContent,
    ItemKind, Source, SourceKind, Task, TaskDetail, TaskStatus, ThreadItem, ToolCallStatus,
    ToolChoice, UserContent, Workflow, WorkflowKind, WorkflowSummary,
};

// event
pub use event::{
    error_codes, ErrorEvent, ItemUpdate, NoticeLevel, ThreadStreamEvent, WorkflowUpdate,
};

// action
pub use action::{Action, ActionMode, FeedbackKind, LoadingBehavior};

// request
pub use request::{ChatRequest, Operation, OperationKind, UserMessageInput};

// context
pub use context::RequestContext;

// storage
pub use storage::{AttachmentStore, Store, StoreError};

// responder
pub use responder::{EventStream, Responder, ResponderError, ResponseContext};

// ids
pub use ids::{generate_id, now_millis};
