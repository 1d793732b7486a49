//! Shared helpers for the reqwest-based boundary clients.

use serde_json::Value;

/// Read a response as `(status, json)`. A body that is not JSON reads as `{}`.
pub(crate) async fn read_json(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response
        .json::<Value>()
        .await
        .unwrap_or_else(|_| Value::Object(Default::default()));
    (status, body)
}

/// The `error` field of a failure body, or `fallback`.
///
/// Accepts both `{"error": "msg"}` and `{"error": {"message": "msg"}}`.
pub(crate) fn error_message(body: &Value, fallback: impl FnOnce() -> String) -> String {
    match body.get("error") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(obj @ Value::Object(_)) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(fallback),
        _ => fallback(),
    }
}

pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
