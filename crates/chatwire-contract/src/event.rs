use chatwire_widget::WidgetPatch;
use serde::{Deserialize, Serialize};

use crate::item::{Annotation, AssistantContent, Task, ThreadItem, WorkflowSummary};
use crate::thread::Thread;

/// Well-known `error` event codes emitted by the core itself.
pub mod error_codes {
    /// Generic retryable failure. Internal detail is never sent with it.
    pub const STREAM_ERROR: &str = "stream.error";
    /// The turn exceeded its wall-clock budget.
    pub const STREAM_TIMEOUT: &str = "stream.timeout";
    /// A collaborator reported a failure without a more specific code.
    pub const CUSTOM: &str = "custom";
}

/// Events of a streaming turn, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadStreamEvent {
    /// A new thread was created for this turn.
    #[serde(rename = "thread.created")]
    ThreadCreated { thread: Thread },
    /// Thread metadata changed.
    #[serde(rename = "thread.updated")]
    ThreadUpdated { thread: Thread },
    /// An item started streaming. Not persisted.
    #[serde(rename = "thread.item.added")]
    ItemAdded { item: ThreadItem },
    /// Incremental update of a streaming item.
    #[serde(rename = "thread.item.updated")]
    ItemUpdated { item_id: String, update: ItemUpdate },
    /// An item is complete.
    #[serde(rename = "thread.item.done")]
    ItemDone { item: ThreadItem },
    #[serde(rename = "thread.item.removed")]
    ItemRemoved { item_id: String },
    #[serde(rename = "thread.item.replaced")]
    ItemReplaced { item: ThreadItem },
    /// Incremental update of a widget item's tree.
    #[serde(rename = "widget.patch")]
    WidgetPatch { item_id: String, patch: WidgetPatch },
    #[serde(rename = "workflow.update")]
    WorkflowUpdate {
        item_id: String,
        update: WorkflowUpdate,
    },
    #[serde(rename = "progress_update")]
    ProgressUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
        text: String,
    },
    #[serde(rename = "notice")]
    Notice {
        level: NoticeLevel,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// Terminal failure.
    #[serde(rename = "error")]
    Error(ErrorEvent),
    /// Terminal success.
    #[serde(rename = "done")]
    Done,
}

impl ThreadStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Done)
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ThreadCreated { .. } => "thread.created",
            Self::ThreadUpdated { .. } => "thread.updated",
            Self::ItemAdded { .. } => "thread.item.added",
            Self::ItemUpdated { .. } => "thread.item.updated",
            Self::ItemDone { .. } => "thread.item.done",
            Self::ItemRemoved { .. } => "thread.item.removed",
            Self::ItemReplaced { .. } => "thread.item.replaced",
            Self::WidgetPatch { .. } => "widget.patch",
            Self::WorkflowUpdate { .. } => "workflow.update",
            Self::ProgressUpdate { .. } => "progress_update",
            Self::Notice { .. } => "notice",
            Self::Error(_) => "error",
            Self::Done => "done",
        }
    }

    /// Id of the item this event refers to, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::ItemAdded { item } | Self::ItemDone { item } | Self::ItemReplaced { item } => {
                Some(&item.id)
            }
            Self::ItemUpdated { item_id, .. }
            | Self::ItemRemoved { item_id }
            | Self::WidgetPatch { item_id, .. }
            | Self::WorkflowUpdate { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, allow_retry: bool) -> Self {
        Self::Error(ErrorEvent {
            code: code.into(),
            message: Some(message.into()),
            allow_retry,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub allow_retry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Danger,
}

/// Payload of `thread.item.updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemUpdate {
    #[serde(rename = "assistant_message.content_part.added")]
    ContentPartAdded {
        content_index: usize,
        content: AssistantContent,
    },
    #[serde(rename = "assistant_message.content_part.text_delta")]
    TextDelta { content_index: usize, delta: String },
    #[serde(rename = "assistant_message.content_part.annotation_added")]
    AnnotationAdded {
        content_index: usize,
        annotation_index: usize,
        annotation: Annotation,
    },
    #[serde(rename = "assistant_message.content_part.done")]
    ContentPartDone {
        content_index: usize,
        content: AssistantContent,
    },
    /// Streaming text inside a widget component, addressed by component key.
    #[serde(rename = "widget.streaming_text.value_delta")]
    StreamingTextDelta {
        component_id: String,
        delta: String,
        done: bool,
    },
}

/// Payload of `workflow.update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowUpdate {
    #[serde(rename = "workflow.task.added")]
    TaskAdded { task_index: usize, task: Task },
    #[serde(rename = "workflow.task.updated")]
    TaskUpdated { task_index: usize, task: Task },
    #[serde(rename = "workflow.summary.set")]
    SummarySet { summary: WorkflowSummary },
}
