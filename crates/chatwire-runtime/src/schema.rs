//! JSON Schemas of the inbound operations.

use chatwire_contract::OperationKind;
use jsonschema::error::ValidationErrorKind;
use serde_json::{json, Value};

use crate::error::ValidationError;

fn id() -> Value {
    json!({"type": "string", "minLength": 1})
}

fn nullable_string() -> Value {
    json!({"type": ["string", "null"]})
}

fn page_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert("limit".into(), json!({"type": ["integer", "null"], "minimum": 0}));
    props.insert("order".into(), json!({"enum": ["asc", "desc"]}));
    props.insert("after".into(), nullable_string());
    props
}

fn user_message_input() -> Value {
    json!({
        "type": "object",
        "required": ["content"],
        "properties": {
            "content": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["type", "text"],
                    "properties": {
                        "type": {"enum": ["input_text", "input_tag"]},
                        "text": {"type": "string"},
                        "id": {"type": "string"},
                        "data": {"type": "object"},
                        "interactive": {"type": "boolean"}
                    },
                    "if": {
                        "required": ["type"],
                        "properties": {"type": {"const": "input_tag"}}
                    },
                    "then": {"required": ["id", "data"]}
                }
            },
            "attachments": {"type": "array", "items": id()},
            "quoted_text": nullable_string(),
            "inference_options": {
                "type": "object",
                "properties": {
                    "tool_choice": {
                        "type": ["object", "null"],
                        "required": ["id"],
                        "properties": {"id": id()}
                    },
                    "model": nullable_string()
                }
            }
        }
    })
}

fn action() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": id(),
            "mode": {"enum": ["blocking", "fire_and_forget"]},
            "loading_behavior": {"enum": ["auto", "self", "container", "none"]}
        }
    })
}

/// Schema of `params`, and whether `params` may be omitted.
fn params_schema(kind: OperationKind) -> (Value, bool) {
    match kind {
        OperationKind::CreateThread => (
            json!({
                "type": "object",
                "properties": {
                    "title": nullable_string(),
                    "metadata": {"type": "object"}
                }
            }),
            false,
        ),
        OperationKind::GetThread | OperationKind::DeleteThread => (
            json!({
                "type": "object",
                "required": ["thread_id"],
                "properties": {"thread_id": id()}
            }),
            true,
        ),
        OperationKind::ListThreads => (
            json!({"type": "object", "properties": page_properties()}),
            false,
        ),
        OperationKind::UpdateThread => (
            json!({
                "type": "object",
                "required": ["thread_id", "title"],
                "properties": {"thread_id": id(), "title": {"type": "string"}}
            }),
            true,
        ),
        OperationKind::AddUserMessage => (
            json!({
                "type": "object",
                "required": ["input"],
                "properties": {
                    "thread_id": {"type": ["string", "null"], "minLength": 1},
                    "input": user_message_input()
                }
            }),
            true,
        ),
        OperationKind::AddClientToolOutput => (
            json!({
                "type": "object",
                "required": ["thread_id", "result"],
                "properties": {"thread_id": id()}
            }),
            true,
        ),
        OperationKind::RetryAfterItem => (
            json!({
                "type": "object",
                "required": ["thread_id", "item_id"],
                "properties": {"thread_id": id(), "item_id": id()}
            }),
            true,
        ),
        OperationKind::CustomAction => (
            json!({
                "type": "object",
                "required": ["thread_id", "action"],
                "properties": {
                    "thread_id": id(),
                    "item_id": {"type": ["string", "null"], "minLength": 1},
                    "action": action()
                }
            }),
            true,
        ),
        OperationKind::ListItems => {
            let mut props = page_properties();
            props.insert("thread_id".into(), id());
            (
                json!({"type": "object", "required": ["thread_id"], "properties": props}),
                true,
            )
        }
        OperationKind::Feedback => (
            json!({
                "type": "object",
                "required": ["thread_id", "item_ids", "kind"],
                "properties": {
                    "thread_id": id(),
                    "item_ids": {"type": "array", "minItems": 1, "items": id()},
                    "kind": {"enum": ["positive", "negative"]}
                }
            }),
            true,
        ),
        OperationKind::CreateAttachment => (
            json!({
                "type": "object",
                "required": ["name", "size", "mime_type"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "size": {"type": "integer", "minimum": 0},
                    "mime_type": {"type": "string", "minLength": 1}
                }
            }),
            true,
        ),
        OperationKind::DeleteAttachment => (
            json!({
                "type": "object",
                "required": ["attachment_id"],
                "properties": {"attachment_id": id()}
            }),
            true,
        ),
    }
}

/// Full request schema for one operation kind.
pub fn operation_schema(kind: OperationKind) -> Value {
    let (params, params_required) = params_schema(kind);
    let mut required = vec![json!("type")];
    if params_required {
        required.push(json!("params"));
    }
    json!({
        "type": "object",
        "required": required,
        "properties": {
            "type": {"const": kind.as_str()},
            "metadata": {"type": "object"},
            "params": params
        }
    })
}

/// Validate a request document against its operation's schema.
///
/// Reports the first violation. For a missing property the path names the
/// property itself rather than its parent object.
pub fn validate(kind: OperationKind, request: &Value) -> Result<(), ValidationError> {
    let schema = operation_schema(kind);
    let validator = jsonschema::Validator::new(&schema)
        .map_err(|e| ValidationError::new("", format!("invalid schema for {kind}: {e}")))?;

    let Some(error) = validator.iter_errors(request).next() else {
        return Ok(());
    };

    let mut path = error.instance_path.to_string();
    if let ValidationErrorKind::Required { property } = &error.kind {
        if let Some(name) = property.as_str() {
            path.push('/');
            path.push_str(name);
        }
    }
    Err(ValidationError::new(path, error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_schema_compiles() {
        for kind in OperationKind::ALL {
            assert!(
                jsonschema::Validator::new(&operation_schema(kind)).is_ok(),
                "{kind}"
            );
        }
    }

    #[test]
    fn missing_param_points_at_the_property() {
        let err = validate(
            OperationKind::GetThread,
            &json!({"type": "threads.get_by_id", "params": {}}),
        )
        .unwrap_err();
        assert_eq!(err.path, "/params/thread_id");
    }

    #[test]
    fn missing_params_object_points_at_params() {
        let err = validate(
            OperationKind::DeleteThread,
            &json!({"type": "threads.delete"}),
        )
        .unwrap_err();
        assert_eq!(err.path, "/params");
    }

    #[test]
    fn wrong_type_points_at_the_value() {
        let err = validate(
            OperationKind::Feedback,
            &json!({
                "type": "items.feedback",
                "params": {"thread_id": "thr_1", "item_ids": ["msg_1"], "kind": "meh"}
            }),
        )
        .unwrap_err();
        assert_eq!(err.path, "/params/kind");
    }

    #[test]
    fn tag_content_requires_its_id() {
        let err = validate(
            OperationKind::AddUserMessage,
            &json!({
                "type": "threads.add_user_message",
                "params": {"input": {"content": [
                    {"type": "input_text", "text": "hi "},
                    {"type": "input_tag", "text": "@sam", "data": {}}
                ]}}
            }),
        )
        .unwrap_err();
        assert_eq!(err.path, "/params/input/content/1/id");
    }

    #[test]
    fn tool_choice_is_an_object() {
        let err = validate(
            OperationKind::AddUserMessage,
            &json!({
                "type": "threads.add_user_message",
                "params": {"input": {
                    "content": [],
                    "inference_options": {"tool_choice": "search"}
                }}
            }),
        )
        .unwrap_err();
        assert_eq!(err.path, "/params/input/inference_options/tool_choice");
    }

    #[test]
    fn optional_params_may_be_omitted() {
        assert!(validate(OperationKind::CreateThread, &json!({"type": "threads.create"})).is_ok());
        assert!(validate(OperationKind::ListThreads, &json!({"type": "threads.list"})).is_ok());
    }
}
