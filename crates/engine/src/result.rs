//! Turning a knowledge service's `result_data` into the value for one
//! pointer.

use schemaloom_core::AssemblyError;
use serde_json::Value;

/// Parse `result_data` for `pointer`.
///
/// `result_data` may already be JSON or may be text holding JSON, possibly
/// inside a Markdown code fence. When `wrapper_key` is given and the parsed
/// value is an object carrying that key, the key's value is returned;
/// otherwise the parsed value is used as-is. Without a wrapper key (root
/// targets) the answer must be an object.
pub fn parse_result(
    pointer: &str,
    wrapper_key: Option<&str>,
    result_data: &Value,
) -> Result<Value, AssemblyError> {
    let parsed = match result_data {
        Value::String(text) => parse_text(text).map_err(|reason| AssemblyError::ResultParse {
            pointer: pointer.to_string(),
            reason,
        })?,
        other => other.clone(),
    };

    match wrapper_key {
        Some(key) => Ok(unwrap_key(parsed, key)),
        None if parsed.is_object() => Ok(parsed),
        None => Err(AssemblyError::ResultParse {
            pointer: pointer.to_string(),
            reason: format!("expected an object, got {}", type_name(&parsed)),
        }),
    }
}

fn parse_text(text: &str) -> Result<Value, String> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err("empty response".into());
    }
    serde_json::from_str(body).map_err(|e| format!("not valid JSON: {e}"))
}

/// Strip a surrounding ```` ```lang ... ``` ```` fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn unwrap_key(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
