//! Pointer schema extraction.
//!
//! Given a root JSON Schema and a pointer into it, build a standalone schema
//! for the single-key object a knowledge service returns when asked for the
//! value at that pointer. The result stays independently resolvable: root
//! `$defs`/`definitions` and identity metadata travel with it.

use std::borrow::Cow;

use schemaloom_core::{JsonPointer, PointerError};
use serde_json::{Map, Value, json};

use crate::keywords::{INDEXED_SCHEMA_KEYWORDS, NAMED_SCHEMA_KEYWORDS};

/// Root keywords that constrain the root value itself. They are never
/// copied onto the wrapper; everything else at the root (identity,
/// annotations, definitions, extension keys) is.
const ROOT_ONLY_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "required",
    "additionalProperties",
    "patternProperties",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "dependentRequired",
    "dependentSchemas",
    "dependencies",
    "unevaluatedProperties",
    "unevaluatedItems",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "items",
    "prefixItems",
    "additionalItems",
    "contains",
    "minContains",
    "maxContains",
    "minItems",
    "maxItems",
    "uniqueItems",
    "enum",
    "const",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "default",
    "examples",
    "$ref",
    "$dynamicRef",
];

/// Extract the standalone schema for `pointer` inside `root`.
///
/// The empty pointer returns `root` itself. Otherwise the value at the
/// pointer is wrapped as the only (required) property of a closed object,
/// keyed by the pointer's final token. When the pointer names a
/// `properties` map itself, that map is used directly as the wrapper's
/// properties.
///
/// Root metadata is carried over with a deny-list rather than by dropping
/// only `type`, `properties`, `required` and `additionalProperties`: every
/// keyword in `ROOT_ONLY_KEYWORDS` is withheld, so root-level
/// composition (`allOf`, `$ref`, ...), value constraints (`enum`,
/// `format`, ...) and array keywords never land on the wrapper object.
pub fn schema_for_pointer<'a>(
    root: &'a Value,
    pointer: &JsonPointer,
) -> Result<Cow<'a, Value>, PointerError> {
    let Some(parent_key) = pointer.last() else {
        return Ok(Cow::Borrowed(root));
    };
    let leaf = pointer.resolve(root)?;

    let mut out = Map::new();
    if let Value::Object(root_map) = root {
        for (key, value) in root_map {
            if ROOT_ONLY_KEYWORDS.contains(&key.as_str()) {
                continue;
            }
            let value = match (key.as_str(), value) {
                ("title", Value::String(title)) => Value::String(format!("{title} - {pointer}")),
                _ => value.clone(),
            };
            out.insert(key.clone(), value);
        }
    }

    let (properties, required) = match leaf {
        Value::Object(props) if names_properties_map(pointer) => {
            let required: Vec<Value> = props.keys().cloned().map(Value::String).collect();
            (Value::Object(props.clone()), required)
        }
        _ => {
            let mut props = Map::new();
            props.insert(parent_key.to_string(), leaf.clone());
            (Value::Object(props), vec![Value::String(parent_key.to_string())])
        }
    };

    out.insert("type".into(), json!("object"));
    out.insert("properties".into(), properties);
    out.insert("required".into(), Value::Array(required));
    out.insert("additionalProperties".into(), Value::Bool(false));
    Ok(Cow::Owned(Value::Object(out)))
}

/// Convenience wrapper taking the pointer in string form.
pub fn schema_for_pointer_str<'a>(
    root: &'a Value,
    pointer: &str,
) -> Result<Cow<'a, Value>, PointerError> {
    schema_for_pointer(root, &JsonPointer::parse(pointer)?)
}

/// The key under which the knowledge service's answer for `pointer` is
/// expected, or `None` when the answer is the properties map itself.
pub fn result_key(pointer: &JsonPointer) -> Option<&str> {
    if names_properties_map(pointer) {
        None
    } else {
        pointer.last()
    }
}

/// Whether the final token is the `properties` keyword (as opposed to a
/// property that happens to be named "properties").
fn names_properties_map(pointer: &JsonPointer) -> bool {
    #[derive(Clone, Copy)]
    enum Expect {
        Keyword,
        Name,
    }

    let mut expect = Expect::Keyword;
    let mut last_was_properties = false;
    for token in pointer.tokens() {
        match expect {
            Expect::Keyword => {
                last_was_properties = token == "properties";
                let kw = token.as_str();
                if NAMED_SCHEMA_KEYWORDS.contains(&kw) || INDEXED_SCHEMA_KEYWORDS.contains(&kw) {
                    expect = Expect::Name;
                }
            }
            Expect::Name => {
                last_was_properties = false;
                expect = Expect::Keyword;
            }
        }
    }
    last_was_properties
}
