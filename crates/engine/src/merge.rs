//! Inserting per-pointer values into the document under assembly.

use schemaloom_core::{AssemblyError, DocumentTarget, TargetSegment};
use serde_json::{Map, Value};

/// Insert `value` into `document` at `target`, creating intermediate
/// containers as needed.
///
/// Root targets merge an object key-wise into the document. `array_items`
/// targets wrap a non-array value into a one-element array.
pub fn insert(
    document: &mut Value,
    pointer: &str,
    target: &DocumentTarget,
    value: Value,
) -> Result<(), AssemblyError> {
    let value = match value {
        Value::Array(_) => value,
        other if target.array_items => Value::Array(vec![other]),
        other => other,
    };

    if target.is_root() {
        return merge_root(document, pointer, value);
    }

    let mut slot = document;
    for segment in &target.segments {
        slot = child_slot(slot, segment).ok_or_else(|| AssemblyError::Insertion {
            pointer: pointer.to_string(),
            reason: format!(
                "'{}' crosses a value that is not {}",
                target.path(),
                match segment {
                    TargetSegment::Key(_) => "an object",
                    TargetSegment::Index(_) => "an array",
                }
            ),
        })?;
    }
    *slot = value;
    Ok(())
}

fn merge_root(document: &mut Value, pointer: &str, value: Value) -> Result<(), AssemblyError> {
    match (document, value) {
        (Value::Object(doc), Value::Object(incoming)) => {
            doc.extend(incoming);
            Ok(())
        }
        (doc, value) if is_empty(doc) => {
            *doc = value;
            Ok(())
        }
        _ => Err(AssemblyError::Insertion {
            pointer: pointer.to_string(),
            reason: "only an object can be merged into a non-empty document root".into(),
        }),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn child_slot<'v>(parent: &'v mut Value, segment: &TargetSegment) -> Option<&'v mut Value> {
    if parent.is_null() {
        *parent = match segment {
            TargetSegment::Key(_) => Value::Object(Map::new()),
            TargetSegment::Index(_) => Value::Array(Vec::new()),
        };
    }
    match (parent, segment) {
        (Value::Object(map), TargetSegment::Key(key)) => {
            Some(map.entry(key.clone()).or_insert(Value::Null))
        }
        (Value::Array(items), TargetSegment::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            items.get_mut(*index)
        }
        _ => None,
    }
}
