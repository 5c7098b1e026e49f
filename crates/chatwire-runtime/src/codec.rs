//! Envelope codec: raw request bytes in, typed requests out; typed events in,
//! SSE frames out.

use bytes::Bytes;
use chatwire_contract::{ChatRequest, OperationKind, ThreadStreamEvent};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::schema;

/// Accepted alias of the `type` discriminator.
const KIND_ALIAS: &str = "kind";

/// Decode one inbound request.
///
/// Unknown kinds are rejected with path `/type` before any schema check.
pub fn decode(raw: &[u8]) -> Result<ChatRequest, ValidationError> {
    let mut value: Value = serde_json::from_slice(raw)
        .map_err(|e| ValidationError::new("", format!("malformed JSON: {e}")))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| ValidationError::new("", "request must be a JSON object"))?;

    normalize_kind_alias(object)?;

    let kind = match object.get("type") {
        Some(Value::String(name)) => OperationKind::parse(name).ok_or_else(|| {
            ValidationError::new("/type", format!("unknown operation kind `{name}`"))
        })?,
        Some(_) => return Err(ValidationError::new("/type", "operation kind must be a string")),
        None => return Err(ValidationError::new("/type", "missing operation kind")),
    };

    schema::validate(kind, &value)?;

    serde_json::from_value(value).map_err(|e| ValidationError::new("", e.to_string()))
}

fn normalize_kind_alias(object: &mut Map<String, Value>) -> Result<(), ValidationError> {
    let Some(alias) = object.remove(KIND_ALIAS) else {
        return Ok(());
    };
    match object.get("type") {
        None => {
            object.insert("type".to_string(), alias);
            Ok(())
        }
        Some(existing) if *existing == alias => Ok(()),
        Some(_) => Err(ValidationError::new(
            "/kind",
            "`kind` and `type` name different operations",
        )),
    }
}

/// Serialize one value as a single-line JSON document.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(value).map(Bytes::from)
}

/// Serialize one event as an SSE frame: `data: <json>\n\n`.
pub fn encode_event(event: &ThreadStreamEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}
