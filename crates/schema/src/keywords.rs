//! Where subschemas live inside a schema object.
//!
//! The reference graph, the cycle inliner and the keyword rewriter all walk
//! exactly these positions. Annotation and data keywords (`enum`, `const`,
//! `default`, `examples`) are never descended into.

use serde_json::{Map, Value};

/// Keywords whose value is an object of named subschemas.
///
/// Draft-07 `dependencies` may also map a name to an array of property
/// names; those entries are not schemas and are passed over by every walker.
pub(crate) const NAMED_SCHEMA_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
    "dependencies",
];

/// Keywords whose value is a single subschema. `items` and
/// `additionalItems` also take the draft-07 tuple (array) form.
pub(crate) const SINGLE_SCHEMA_KEYWORDS: &[&str] = &[
    "items",
    "additionalProperties",
    "contains",
    "not",
    "if",
    "then",
    "else",
    "propertyNames",
    "unevaluatedItems",
    "unevaluatedProperties",
    "additionalItems",
];

/// Keywords whose value is an array of subschemas.
pub(crate) const INDEXED_SCHEMA_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Call `f` for every subschema directly nested in `map`.
pub(crate) fn for_each_subschema<'v>(
    map: &'v Map<String, Value>,
    mut f: impl FnMut(&'v Value),
) {
    for &keyword in NAMED_SCHEMA_KEYWORDS {
        if let Some(Value::Object(children)) = map.get(keyword) {
            children.values().for_each(&mut f);
        }
    }
    for &keyword in SINGLE_SCHEMA_KEYWORDS {
        match map.get(keyword) {
            Some(Value::Array(members)) => members.iter().for_each(&mut f),
            Some(child) => f(child),
            None => {}
        }
    }
    for &keyword in INDEXED_SCHEMA_KEYWORDS {
        if let Some(Value::Array(members)) = map.get(keyword) {
            members.iter().for_each(&mut f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn children(schema: Value) -> Vec<Value> {
        let Value::Object(map) = schema else {
            panic!("not an object");
        };
        let mut out = Vec::new();
        for_each_subschema(&map, |child| out.push(child.clone()));
        out
    }

    #[test]
    fn data_keywords_are_not_subschemas() {
        let found = children(json!({
            "type": "string",
            "enum": [{ "type": "object" }],
            "const": { "type": "object" },
            "default": { "type": "object" },
            "examples": [{ "type": "object" }]
        }));
        assert!(found.is_empty());
    }

    #[test]
    fn tuple_items_yield_each_member() {
        let found = children(json!({
            "type": "array",
            "items": [{ "type": "string" }, { "type": "number" }],
            "additionalItems": { "type": "boolean" }
        }));
        assert_eq!(
            found,
            [json!({ "type": "string" }), json!({ "type": "number" }), json!({ "type": "boolean" })]
        );
    }

    #[test]
    fn dependencies_yield_schema_and_name_list_entries() {
        let found = children(json!({
            "dependencies": { "card": ["billing"], "ship": { "required": ["address"] } }
        }));
        assert_eq!(found.len(), 2);
        assert!(found.contains(&json!({ "required": ["address"] })));
    }
}
