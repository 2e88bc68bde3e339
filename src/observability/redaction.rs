//! Redaction of sensitive request fields before they reach the logs.
//!
//! Only the copy handed to the logger is masked; the request body seen by
//! handlers is never touched.

use serde_json::{Map, Value};

/// Replacement for top-level secrets.
pub const SECRET_MASK: &str = "************";

/// Replacement for `device_info.device_id`.
pub const DEVICE_ID_MASK: &str = "**************";

const SECRET_FIELDS: [&str; 3] = ["password", "token", "confirmPassword"];
const DEVICE_INFO_FIELD: &str = "device_info";
const DEVICE_ID_FIELD: &str = "device_id";

/// Decode a request body as a JSON object. Anything else yields `None`.
pub fn decode_payload(body: &[u8]) -> Option<Map<String, Value>> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

/// Shallow copy of `payload` with secrets masked.
pub fn sanitize_payload(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .map(|(key, value)| {
            let value = if SECRET_FIELDS.contains(&key.as_str()) {
                Value::String(SECRET_MASK.to_string())
            } else if key == DEVICE_INFO_FIELD {
                sanitize_device_info(value)
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

fn sanitize_device_info(value: &Value) -> Value {
    match value {
        Value::Object(device) => Value::Object(
            device
                .iter()
                .map(|(key, value)| {
                    if key == DEVICE_ID_FIELD {
                        (key.clone(), Value::String(DEVICE_ID_MASK.to_string()))
                    } else {
                        (key.clone(), value.clone())
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
