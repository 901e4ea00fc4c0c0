//! Structured-output compatibility rewriting.
//!
//! Providers that constrain generation with a JSON Schema accept only a
//! subset of the keyword vocabulary and reject recursive definitions. This
//! module downgrades an arbitrary schema to that subset:
//!
//! 1. Cyclic `$defs`/`definitions` entries are flattened by inlining the
//!    referenced definition a bounded number of levels, dropping the
//!    recursive property at the last level.
//! 2. Unsupported keywords are removed or relaxed (`minItems` capped at 1,
//!    numeric and length bounds dropped, `prefixItems` collapsed into
//!    `items`, objects closed with `additionalProperties: false`).
//!
//! Every rewrite is reported as a [`ChangeDescription`]. The rewrite is a
//! best-effort hint and never fails: on an internal error the original
//! schema is returned untouched.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::graph::{DefinitionRef, RefGraph};
use crate::keywords::{INDEXED_SCHEMA_KEYWORDS, NAMED_SCHEMA_KEYWORDS, SINGLE_SCHEMA_KEYWORDS};

/// Keywords removed wherever they appear.
const REMOVED_KEYWORDS: &[&str] = &[
    "uniqueItems",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
];

/// Keyword names whose presence means a schema may need rewriting.
const FLAGGED_KEYWORDS: &[&str] = &[
    "minItems",
    "uniqueItems",
    "contains",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "prefixItems",
    "$ref",
];

const REMOVED_REASON: &str = "removed (not supported by provider)";

/// Tuning for [`make_compatible_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatOptions {
    /// How many levels a recursive definition is inlined before the
    /// recursive property is dropped.
    pub max_inline_depth: usize,
    /// Nesting limit beyond which preprocessing gives up (fail-open).
    pub max_schema_depth: usize,
}

impl Default for CompatOptions {
    fn default() -> Self {
        Self {
            max_inline_depth: 1,
            max_schema_depth: 128,
        }
    }
}

/// One rewrite applied to a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescription {
    /// Dotted/bracketed location, e.g. `properties.tags.minItems`
    pub path: String,
    pub reason: String,
}

impl fmt::Display for ChangeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Output of the preprocessor.
#[derive(Debug, Clone)]
pub struct Compatibility<'a> {
    /// Borrowed when nothing had to change.
    pub schema: Cow<'a, Value>,
    pub changes: Vec<ChangeDescription>,
}

impl Compatibility<'_> {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_owned(self) -> Value {
        self.schema.into_owned()
    }
}

#[derive(Debug, Error)]
enum CompatError {
    #[error("schema nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    #[error("recursive reference to missing definition '{0}'")]
    MissingDefinition(String),
}

/// Rewrite `schema` for structured-output providers with default options.
pub fn make_compatible(schema: &Value) -> Compatibility<'_> {
    make_compatible_with(schema, &CompatOptions::default())
}

/// Rewrite `schema` for structured-output providers.
pub fn make_compatible_with<'a>(schema: &'a Value, options: &CompatOptions) -> Compatibility<'a> {
    let unchanged = || Compatibility {
        schema: Cow::Borrowed(schema),
        changes: Vec::new(),
    };

    if !needs_rewrite(schema) {
        return unchanged();
    }

    match rewrite(schema, options) {
        Ok((_, changes)) if changes.is_empty() => unchanged(),
        Ok((rewritten, changes)) => {
            debug!(changes = changes.len(), "Schema rewritten for provider compatibility");
            Compatibility {
                schema: Cow::Owned(rewritten),
                changes,
            }
        }
        Err(e) => {
            warn!(error = %e, "Compatibility preprocessing failed, using original schema");
            unchanged()
        }
    }
}

/// Cheap read-only scan: could any rule fire anywhere in `value`?
fn needs_rewrite(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.keys().any(|k| FLAGGED_KEYWORDS.contains(&k.as_str()))
                || map.get("format").and_then(Value::as_str) == Some("binary")
                || (has_type(map, "object")
                    && map.get("additionalProperties") != Some(&Value::Bool(false)))
                || map.values().any(needs_rewrite)
        }
        Value::Array(items) => items.iter().any(needs_rewrite),
        _ => false,
    }
}

fn rewrite(
    schema: &Value,
    options: &CompatOptions,
) -> Result<(Value, Vec<ChangeDescription>), CompatError> {
    let mut out = schema.clone();
    let mut changes = Vec::new();
    flatten_cycles(&mut out, options, &mut changes)?;

    let mut rewriter = KeywordRewriter {
        changes: &mut changes,
        max_depth: options.max_schema_depth,
    };
    rewriter.visit(&mut out, &mut Vec::new(), 0)?;
    Ok((out, changes))
}

/// `type` is `name` or a list containing `name`.
fn has_type(map: &Map<String, Value>, name: &str) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
        _ => false,
    }
}

// ── Cycle flattening ───────────────────────────────────────────────────────

fn flatten_cycles(
    schema: &mut Value,
    options: &CompatOptions,
    changes: &mut Vec<ChangeDescription>,
) -> Result<(), CompatError> {
    let graph = RefGraph::build(schema);
    let cycles = graph.cycles();
    if cycles.is_empty() {
        return Ok(());
    }

    let originals: BTreeMap<DefinitionRef, Value> = cycles
        .keys()
        .filter_map(|def| {
            schema
                .get(&def.container)
                .and_then(|defs| defs.get(&def.name))
                .map(|body| (def.clone(), body.clone()))
        })
        .collect();

    let inliner = Inliner {
        originals: &originals,
        max_depth: options.max_schema_depth,
    };

    for (def, cycle) in &cycles {
        let Some(body) = originals.get(def) else {
            continue;
        };
        let flattened = inliner
            .inline(body.clone(), options.max_inline_depth, 0)?
            .unwrap_or_else(|| json!({}));

        if let Some(slot) = schema
            .get_mut(&def.container)
            .and_then(|defs| defs.get_mut(&def.name))
        {
            *slot = flattened;
        }

        let walk: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        changes.push(ChangeDescription {
            path: def.path(),
            reason: format!(
                "flattened recursive reference {} to depth {}",
                walk.join(" -> "),
                options.max_inline_depth
            ),
        });
    }

    debug!(definitions = cycles.len(), "Flattened recursive schema definitions");
    Ok(())
}

/// Replaces references to cyclic definitions with copies of their bodies.
///
/// `inline` returns `None` when the node itself is the recursion that must
/// be cut; callers drop the property (or keyword) that held it.
struct Inliner<'a> {
    originals: &'a BTreeMap<DefinitionRef, Value>,
    max_depth: usize,
}

impl Inliner<'_> {
    fn inline(
        &self,
        node: Value,
        remaining: usize,
        nesting: usize,
    ) -> Result<Option<Value>, CompatError> {
        if nesting > self.max_depth {
            return Err(CompatError::TooDeep { limit: self.max_depth });
        }
        let mut map = match node {
            Value::Object(map) => map,
            other => return Ok(Some(other)),
        };

        let cyclic_target = map
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(DefinitionRef::from_ref)
            .filter(|target| self.originals.contains_key(target));

        if let Some(target) = cyclic_target {
            if remaining == 0 {
                return Ok(None);
            }
            let body = self
                .originals
                .get(&target)
                .cloned()
                .ok_or_else(|| CompatError::MissingDefinition(target.name.clone()))?;
            map.remove("$ref");
            let Some(inlined) = self.inline(body, remaining - 1, nesting + 1)? else {
                return Ok(None);
            };
            let merged = match inlined {
                Value::Object(mut body) => {
                    body.extend(map);
                    body
                }
                other if map.is_empty() => return Ok(Some(other)),
                _ => map,
            };
            return self.inline_children(merged, remaining, nesting);
        }

        self.inline_children(map, remaining, nesting)
    }

    fn inline_children(
        &self,
        mut map: Map<String, Value>,
        remaining: usize,
        nesting: usize,
    ) -> Result<Option<Value>, CompatError> {
        for &keyword in NAMED_SCHEMA_KEYWORDS {
            if !matches!(map.get(keyword), Some(Value::Object(_))) {
                continue;
            }
            let Some(Value::Object(children)) = map.remove(keyword) else {
                continue;
            };
            let mut kept = Map::new();
            let mut dropped = Vec::new();
            for (name, child) in children {
                match self.inline(child, remaining, nesting + 1)? {
                    Some(child) => {
                        kept.insert(name, child);
                    }
                    None => dropped.push(name),
                }
            }
            if keyword == "properties" && !dropped.is_empty() {
                if let Some(Value::Array(required)) = map.get_mut("required") {
                    required.retain(|r| {
                        !r.as_str().is_some_and(|r| dropped.iter().any(|d| d == r))
                    });
                }
            }
            map.insert(keyword.to_string(), Value::Object(kept));
        }

        for &keyword in SINGLE_SCHEMA_KEYWORDS {
            let Some(child) = map.remove(keyword) else {
                continue;
            };
            // Draft-07 tuple form of `items`/`additionalItems`
            if let Value::Array(members) = child {
                let kept = self.inline_tuple(members, remaining, nesting)?;
                if !kept.is_empty() {
                    map.insert(keyword.to_string(), Value::Array(kept));
                }
                continue;
            }
            match self.inline(child, remaining, nesting + 1)? {
                Some(child) => {
                    map.insert(keyword.to_string(), child);
                }
                // An array whose elements are the recursion goes with it.
                None if matches!(keyword, "items" | "contains" | "additionalItems") => {
                    return Ok(None);
                }
                None => {}
            }
        }

        for &keyword in INDEXED_SCHEMA_KEYWORDS {
            if !matches!(map.get(keyword), Some(Value::Array(_))) {
                continue;
            }
            let Some(Value::Array(members)) = map.remove(keyword) else {
                continue;
            };
            if keyword == "prefixItems" {
                let kept = self.inline_tuple(members, remaining, nesting)?;
                if !kept.is_empty() {
                    map.insert(keyword.to_string(), Value::Array(kept));
                }
                continue;
            }
            let mut kept = Vec::with_capacity(members.len());
            for member in members {
                match self.inline(member, remaining, nesting + 1)? {
                    Some(member) => kept.push(member),
                    None if matches!(keyword, "anyOf" | "oneOf") => {}
                    None => return Ok(None),
                }
            }
            if kept.is_empty() && matches!(keyword, "anyOf" | "oneOf") {
                return Ok(None);
            }
            map.insert(keyword.to_string(), Value::Array(kept));
        }

        Ok(Some(Value::Object(map)))
    }

    /// Positional members up to, not including, the first one that is the
    /// recursion.
    fn inline_tuple(
        &self,
        members: Vec<Value>,
        remaining: usize,
        nesting: usize,
    ) -> Result<Vec<Value>, CompatError> {
        let mut kept = Vec::with_capacity(members.len());
        for member in members {
            match self.inline(member, remaining, nesting + 1)? {
                Some(member) => kept.push(member),
                None => break,
            }
        }
        Ok(kept)
    }
}

// ── Keyword rules ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

fn render_path(path: &[Segment], keyword: &str) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    if !out.is_empty() {
        out.push('.');
    }
    out.push_str(keyword);
    out
}

struct KeywordRewriter<'c> {
    changes: &'c mut Vec<ChangeDescription>,
    max_depth: usize,
}

impl KeywordRewriter<'_> {
    fn record(&mut self, path: &[Segment], keyword: &str, reason: impl Into<String>) {
        self.changes.push(ChangeDescription {
            path: render_path(path, keyword),
            reason: reason.into(),
        });
    }

    fn visit(
        &mut self,
        node: &mut Value,
        path: &mut Vec<Segment>,
        depth: usize,
    ) -> Result<(), CompatError> {
        if depth > self.max_depth {
            return Err(CompatError::TooDeep { limit: self.max_depth });
        }
        let Value::Object(map) = node else {
            return Ok(());
        };

        self.apply_rules(map, path);

        for &keyword in NAMED_SCHEMA_KEYWORDS {
            if let Some(Value::Object(children)) = map.get_mut(keyword) {
                for (name, child) in children.iter_mut() {
                    path.push(Segment::Key(keyword.to_string()));
                    path.push(Segment::Key(name.clone()));
                    self.visit(child, path, depth + 1)?;
                    path.truncate(path.len() - 2);
                }
            }
        }

        for &keyword in SINGLE_SCHEMA_KEYWORDS {
            match map.get_mut(keyword) {
                // Draft-07 tuple form of `items`
                Some(Value::Array(members)) => {
                    self.visit_members(keyword, members, path, depth)?;
                }
                Some(child) => {
                    path.push(Segment::Key(keyword.to_string()));
                    self.visit(child, path, depth + 1)?;
                    path.pop();
                }
                None => {}
            }
        }

        for &keyword in INDEXED_SCHEMA_KEYWORDS {
            if let Some(Value::Array(members)) = map.get_mut(keyword) {
                self.visit_members(keyword, members, path, depth)?;
            }
        }

        Ok(())
    }

    fn visit_members(
        &mut self,
        keyword: &str,
        members: &mut [Value],
        path: &mut Vec<Segment>,
        depth: usize,
    ) -> Result<(), CompatError> {
        for (i, member) in members.iter_mut().enumerate() {
            path.push(Segment::Key(keyword.to_string()));
            path.push(Segment::Index(i));
            self.visit(member, path, depth + 1)?;
            path.truncate(path.len() - 2);
        }
        Ok(())
    }

    fn apply_rules(&mut self, map: &mut Map<String, Value>, path: &[Segment]) {
        if let Some(min_items) = map.get("minItems").and_then(Value::as_f64) {
            if min_items > 1.0 {
                let original = map["minItems"].clone();
                map.insert("minItems".into(), json!(1));
                self.record(path, "minItems", format!("reduced from {original} to 1"));
            }
        }

        for &keyword in REMOVED_KEYWORDS {
            if map.remove(keyword).is_some() {
                self.record(path, keyword, REMOVED_REASON);
            }
        }

        if has_type(map, "array") && map.remove("contains").is_some() {
            self.record(path, "contains", REMOVED_REASON);
        }

        if map.get("format").and_then(Value::as_str) == Some("binary") {
            map.remove("format");
            self.record(path, "format", "removed binary format (not supported by provider)");
        }

        if let Some(prefix_items) = map.remove("prefixItems") {
            self.record(path, "prefixItems", REMOVED_REASON);
            if !map.contains_key("items") {
                if let Some(first) = prefix_items.as_array().and_then(|items| items.first()) {
                    map.insert("items".into(), first.clone());
                    self.record(path, "items", "synthesized from prefixItems[0]");
                }
            }
        }

        if has_type(map, "object") {
            let previous = match map.get("additionalProperties") {
                Some(Value::Bool(false)) => None,
                Some(Value::Bool(true)) => Some("true"),
                Some(_) => Some("a schema"),
                None => Some("absent"),
            };
            if let Some(previous) = previous {
                map.insert("additionalProperties".into(), Value::Bool(false));
                self.record(
                    path,
                    "additionalProperties",
                    format!("set to false (was {previous})"),
                );
            }
        }
    }
}
