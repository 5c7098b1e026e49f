use chatwire_widget::WidgetNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Thread items
// ============================================================================

/// One persisted entry of a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadItem {
    pub id: String,
    pub thread_id: String,
    /// Unix millis.
    pub created_at: u64,
    #[serde(flatten)]
    pub content: ItemContent,
}

/// Item payload, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemContent {
    UserMessage {
        content: Vec<UserContent>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<Attachment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quoted_text: Option<String>,
        #[serde(default)]
        inference_options: InferenceOptions,
    },
    AssistantMessage {
        content: Vec<AssistantContent>,
    },
    ClientToolCall {
        #[serde(default)]
        status: ToolCallStatus,
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: BTreeMap<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    Widget {
        widget: WidgetNode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        copy_text: Option<String>,
    },
    Workflow {
        workflow: Workflow,
    },
    Task {
        task: Task,
    },
    /// Model-only context. Persisted but never shown to clients.
    #[serde(rename = "hidden_context_item")]
    HiddenContext {
        content: Value,
    },
    EndOfTurn,
}

/// Id namespace of generated identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Thread,
    Message,
    ToolCall,
    Task,
    Workflow,
    Widget,
    HiddenContext,
    EndOfTurn,
    Attachment,
}

impl ItemKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Thread => "thr",
            Self::Message => "msg",
            Self::ToolCall => "tc",
            Self::Task => "task",
            Self::Workflow => "wf",
            Self::Widget => "wdg",
            Self::HiddenContext => "ctx",
            Self::EndOfTurn => "eot",
            Self::Attachment => "atc",
        }
    }
}

impl ThreadItem {
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        created_at: u64,
        content: ItemContent,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            created_at,
            content,
        }
    }

    /// Assistant message with a single text part.
    pub fn assistant_text(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        created_at: u64,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            thread_id,
            created_at,
            ItemContent::AssistantMessage {
                content: vec![AssistantContent::text(text)],
            },
        )
    }

    pub fn hidden_context(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        created_at: u64,
        content: Value,
    ) -> Self {
        Self::new(id, thread_id, created_at, ItemContent::HiddenContext { content })
    }

    pub fn widget(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        created_at: u64,
        widget: WidgetNode,
    ) -> Self {
        Self::new(
            id,
            thread_id,
            created_at,
            ItemContent::Widget {
                widget,
                copy_text: None,
            },
        )
    }

    pub fn is_hidden(&self) -> bool {
        self.content.is_hidden()
    }

    pub fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    pub fn is_user_message(&self) -> bool {
        matches!(self.content, ItemContent::UserMessage { .. })
    }

    pub fn is_pending_tool_call(&self) -> bool {
        matches!(
            self.content,
            ItemContent::ClientToolCall {
                status: ToolCallStatus::Pending,
                ..
            }
        )
    }

    /// Concatenated text of a user or assistant message.
    pub fn text(&self) -> Option<String> {
        match &self.content {
            ItemContent::UserMessage { content, .. } => Some(
                content
                    .iter()
                    .map(UserContent::text)
                    .collect::<Vec<_>>()
                    .join(""),
            ),
            ItemContent::AssistantMessage { content } => Some(
                content
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join(""),
            ),
            _ => None,
        }
    }
}

impl ItemContent {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::HiddenContext { .. })
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::UserMessage { .. } | Self::AssistantMessage { .. } => ItemKind::Message,
            Self::ClientToolCall { .. } => ItemKind::ToolCall,
            Self::Widget { .. } => ItemKind::Widget,
            Self::Workflow { .. } => ItemKind::Workflow,
            Self::Task { .. } => ItemKind::Task,
            Self::HiddenContext { .. } => ItemKind::HiddenContext,
            Self::EndOfTurn => ItemKind::EndOfTurn,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    #[default]
    Pending,
    Completed,
}

// ============================================================================
// Message content
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContent {
    InputText {
        text: String,
    },
    /// A reference to an entity the user tagged in the composer.
    InputTag {
        id: String,
        text: String,
        #[serde(default)]
        data: BTreeMap<String, Value>,
        #[serde(default)]
        interactive: bool,
    },
}

impl UserContent {
    pub fn text(&self) -> &str {
        match self {
            Self::InputText { text } | Self::InputTag { text, .. } => text,
        }
    }
}

/// Tool the model is asked to call for this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolChoice {
    pub id: String,
}

impl ToolChoice {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One `output_text` part of an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl AssistantContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub source: Source,
    /// Character offset into the part's text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    File {
        filename: String,
    },
    Url {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    Entity {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
}

// ============================================================================
// Tasks and workflows
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    None,
    Loading,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub status_indicator: TaskStatus,
    #[serde(flatten)]
    pub detail: TaskDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskDetail {
    Custom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    WebSearch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title_query: Option<String>,
        #[serde(default)]
        queries: Vec<String>,
        #[serde(default)]
        sources: Vec<Source>,
    },
    Thought {
        content: String,
    },
    File {
        #[serde(default)]
        sources: Vec<Source>,
    },
    Image,
}

impl Task {
    pub fn custom(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            status_indicator: TaskStatus::None,
            detail: TaskDetail::Custom {
                icon: None,
                content: None,
            },
        }
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self {
            title: None,
            status_indicator: TaskStatus::None,
            detail: TaskDetail::Thought {
                content: content.into(),
            },
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status_indicator = status;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    #[default]
    Custom,
    Reasoning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowSummary {
    Custom {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    /// Elapsed seconds.
    Duration { duration: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(rename = "type", default)]
    pub kind: WorkflowKind,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<WorkflowSummary>,
    #[serde(default)]
    pub expanded: bool,
}

// ============================================================================
// Attachments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(flatten)]
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentKind {
    File,
    Image { preview_url: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_item_is_flat_on_the_wire() {
        let item = ThreadItem::assistant_text("msg_1", "thr_1", 5, "hi");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "id": "msg_1",
                "thread_id": "thr_1",
                "created_at": 5,
                "type": "assistant_message",
                "content": [{"text": "hi"}]
            })
        );
    }

    #[test]
    fn hidden_context_uses_its_own_tag() {
        let item: ThreadItem = serde_json::from_value(json!({
            "id": "ctx_1",
            "thread_id": "thr_1",
            "created_at": 1,
            "type": "hidden_context_item",
            "content": {"note": "model only"}
        }))
        .unwrap();
        assert!(item.is_hidden());
        assert_eq!(item.kind(), ItemKind::HiddenContext);
    }

    #[test]
    fn tool_call_defaults_to_pending() {
        let item: ThreadItem = serde_json::from_value(json!({
            "id": "tc_1",
            "thread_id": "thr_1",
            "created_at": 1,
            "type": "client_tool_call",
            "call_id": "call_1",
            "name": "get_location"
        }))
        .unwrap();
        assert!(item.is_pending_tool_call());
    }

    #[test]
    fn user_text_joins_parts() {
        let item = ThreadItem::new(
            "msg_1",
            "thr_1",
            1,
            ItemContent::UserMessage {
                content: vec![
                    UserContent::InputText {
                        text: "hello ".into(),
                    },
                    UserContent::InputTag {
                        id: "u1".into(),
                        text: "@sam".into(),
                        data: BTreeMap::new(),
                        interactive: false,
                    },
                ],
                attachments: Vec::new(),
                quoted_text: None,
                inference_options: InferenceOptions::default(),
            },
        );
        assert_eq!(item.text().as_deref(), Some("hello @sam"));
        assert!(item.is_user_message());
    }

    #[test]
    fn inference_options_carry_a_tool_choice_object() {
        let options: InferenceOptions = serde_json::from_value(json!({
            "tool_choice": {"id": "web_search"},
            "model": "gpt-x"
        }))
        .unwrap();
        assert_eq!(options.tool_choice, Some(ToolChoice::new("web_search")));
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"tool_choice": {"id": "web_search"}, "model": "gpt-x"})
        );
        assert!(serde_json::from_value::<InferenceOptions>(json!({"tool_choice": "web_search"})).is_err());
    }

    #[test]
    fn task_and_attachment_tags() {
        let task = Task::thought("thinking").with_status(TaskStatus::Loading);
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({"status_indicator": "loading", "type": "thought", "content": "thinking"})
        );

        let attachment: Attachment = serde_json::from_value(json!({
            "id": "atc_1",
            "name": "cat.png",
            "mime_type": "image/png",
            "type": "image",
            "preview_url": "https://example.test/cat.png"
        }))
        .unwrap();
        assert_eq!(
            attachment.kind,
            AttachmentKind::Image {
                preview_url: "https://example.test/cat.png".into()
            }
        );
    }

    #[test]
    fn workflow_summary_shapes() {
        let summary: WorkflowSummary = serde_json::from_value(json!({"duration": 12})).unwrap();
        assert_eq!(summary, WorkflowSummary::Duration { duration: 12 });
        let summary: WorkflowSummary =
            serde_json::from_value(json!({"title": "Searched"})).unwrap();
        assert!(matches!(summary, WorkflowSummary::Custom { .. }));
    }
}
