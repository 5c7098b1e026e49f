//! The closed set of operations a client can request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::action::{Action, FeedbackKind};
use crate::item::{InferenceOptions, UserContent};
use crate::thread::SortOrder;

/// One decoded inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(flatten)]
    pub operation: Operation,
    /// Free-form request metadata, exposed to collaborators via the request context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl ChatRequest {
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    pub fn is_streaming(&self) -> bool {
        self.kind().is_streaming()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    #[serde(rename = "threads.create")]
    CreateThread {
        #[serde(default)]
        params: CreateThreadParams,
    },
    #[serde(rename = "threads.get_by_id")]
    GetThread { params: ThreadIdParams },
    #[serde(rename = "threads.list")]
    ListThreads {
        #[serde(default)]
        params: ListParams,
    },
    #[serde(rename = "threads.update")]
    UpdateThread { params: UpdateThreadParams },
    #[serde(rename = "threads.delete")]
    DeleteThread { params: ThreadIdParams },
    #[serde(rename = "threads.add_user_message")]
    AddUserMessage { params: AddUserMessageParams },
    #[serde(rename = "threads.add_client_tool_output")]
    AddClientToolOutput { params: ClientToolOutputParams },
    #[serde(rename = "threads.retry_after_item")]
    RetryAfterItem { params: RetryAfterItemParams },
    #[serde(rename = "threads.custom_action")]
    CustomAction { params: CustomActionParams },
    #[serde(rename = "items.list")]
    ListItems { params: ListItemsParams },
    #[serde(rename = "items.feedback")]
    Feedback { params: FeedbackParams },
    #[serde(rename = "attachments.create")]
    CreateAttachment { params: CreateAttachmentParams },
    #[serde(rename = "attachments.delete")]
    DeleteAttachment { params: AttachmentIdParams },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateThread { .. } => OperationKind::CreateThread,
            Self::GetThread { .. } => OperationKind::GetThread,
            Self::ListThreads { .. } => OperationKind::ListThreads,
            Self::UpdateThread { .. } => OperationKind::UpdateThread,
            Self::DeleteThread { .. } => OperationKind::DeleteThread,
            Self::AddUserMessage { .. } => OperationKind::AddUserMessage,
            Self::AddClientToolOutput { .. } => OperationKind::AddClientToolOutput,
            Self::RetryAfterItem { .. } => OperationKind::RetryAfterItem,
            Self::CustomAction { .. } => OperationKind::CustomAction,
            Self::ListItems { .. } => OperationKind::ListItems,
            Self::Feedback { .. } => OperationKind::Feedback,
            Self::CreateAttachment { .. } => OperationKind::CreateAttachment,
            Self::DeleteAttachment { .. } => OperationKind::DeleteAttachment,
        }
    }
}

/// Operation discriminator. Whether an operation streams is a fixed
/// property of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateThread,
    GetThread,
    ListThreads,
    UpdateThread,
    DeleteThread,
    AddUserMessage,
    AddClientToolOutput,
    RetryAfterItem,
    CustomAction,
    ListItems,
    Feedback,
    CreateAttachment,
    DeleteAttachment,
}

impl OperationKind {
    pub const ALL: [OperationKind; 13] = [
        Self::CreateThread,
        Self::GetThread,
        Self::ListThreads,
        Self::UpdateThread,
        Self::DeleteThread,
        Self::AddUserMessage,
        Self::AddClientToolOutput,
        Self::RetryAfterItem,
        Self::CustomAction,
        Self::ListItems,
        Self::Feedback,
        Self::CreateAttachment,
        Self::DeleteAttachment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateThread => "threads.create",
            Self::GetThread => "threads.get_by_id",
            Self::ListThreads => "threads.list",
            Self::UpdateThread => "threads.update",
            Self::DeleteThread => "threads.delete",
            Self::AddUserMessage => "threads.add_user_message",
            Self::AddClientToolOutput => "threads.add_client_tool_output",
            Self::RetryAfterItem => "threads.retry_after_item",
            Self::CustomAction => "threads.custom_action",
            Self::ListItems => "items.list",
            Self::Feedback => "items.feedback",
            Self::CreateAttachment => "attachments.create",
            Self::DeleteAttachment => "attachments.delete",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn is_streaming(self) -> bool {
        match self {
            Self::AddUserMessage
            | Self::AddClientToolOutput
            | Self::RetryAfterItem
            | Self::CustomAction => true,
            Self::CreateThread
            | Self::GetThread
            | Self::ListThreads
            | Self::UpdateThread
            | Self::DeleteThread
            | Self::ListItems
            | Self::Feedback
            | Self::CreateAttachment
            | Self::DeleteAttachment => false,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateThreadParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadIdParams {
    pub thread_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateThreadParams {
    pub thread_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageInput {
    pub content: Vec<UserContent>,
    /// Ids of previously created attachments.
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    #[serde(default)]
    pub inference_options: InferenceOptions,
}

impl UserMessageInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![UserContent::InputText { text: text.into() }],
            attachments: Vec::new(),
            quoted_text: None,
            inference_options: InferenceOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddUserMessageParams {
    /// Absent: a new thread is created for the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub input: UserMessageInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientToolOutputParams {
    pub thread_id: String,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryAfterItemParams {
    pub thread_id: String,
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomActionParams {
    pub thread_id: String,
    /// The item (usually a widget) the action originated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemsParams {
    pub thread_id: String,
    #[serde(flatten)]
    pub page: ListParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackParams {
    pub thread_id: String,
    pub item_ids: Vec<String>,
    pub kind: FeedbackKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAttachmentParams {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentIdParams {
    pub attachment_id: String,
}
