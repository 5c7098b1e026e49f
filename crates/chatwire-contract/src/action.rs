use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A widget-originated action.
///
/// `kind` is the opaque handler reference the Action Router dispatches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub mode: ActionMode,
    #[serde(default)]
    pub loading_behavior: LoadingBehavior,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            mode: ActionMode::Blocking,
            loading_behavior: LoadingBehavior::Auto,
        }
    }

    #[must_use]
    pub fn fire_and_forget(mut self) -> Self {
        self.mode = ActionMode::FireAndForget;
        self
    }
}

/// Whether the client waits for the action's event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// Events are streamed back on the same response.
    #[default]
    Blocking,
    /// The response ends right away; the handler's events are only persisted.
    FireAndForget,
}

/// Client-side loading hint. Passed through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingBehavior {
    #[default]
    Auto,
    #[serde(rename = "self")]
    OwnComponent,
    Container,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_defaults_to_blocking() {
        let action: Action = serde_json::from_value(json!({"type": "cart.add"})).unwrap();
        assert_eq!(action.kind, "cart.add");
        assert_eq!(action.mode, ActionMode::Blocking);
        assert_eq!(action.payload, Value::Null);
    }

    #[test]
    fn loading_behavior_self_is_renamed() {
        let action: Action = serde_json::from_value(json!({
            "type": "open",
            "mode": "fire_and_forget",
            "loading_behavior": "self"
        }))
        .unwrap();
        assert_eq!(action.mode, ActionMode::FireAndForget);
        assert_eq!(action.loading_behavior, LoadingBehavior::OwnComponent);
    }
}
