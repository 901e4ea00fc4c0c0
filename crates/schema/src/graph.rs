//! Reference graph over root-level schema definitions.
//!
//! Nodes are the entries of `$defs` and `definitions`; an edge `A → B`
//! exists when a subschema of A's body is `"$ref": "#/$defs/B"` (or the
//! `definitions` form). A definition is cyclic when it can reach itself.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use schemaloom_core::JsonPointer;
use serde_json::Value;

use crate::keywords::for_each_subschema;

/// Containers that hold named definitions.
pub const DEFINITION_CONTAINERS: &[&str] = &["$defs", "definitions"];

/// One named definition, e.g. `$defs/Node`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefinitionRef {
    pub container: String,
    pub name: String,
}

impl DefinitionRef {
    /// Parse a local `$ref` such as `#/$defs/Node`.
    pub fn from_ref(reference: &str) -> Option<Self> {
        let pointer = JsonPointer::parse(reference.strip_prefix('#')?).ok()?;
        match pointer.tokens() {
            [container, name] if DEFINITION_CONTAINERS.contains(&container.as_str()) => Some(Self {
                container: container.clone(),
                name: name.clone(),
            }),
            _ => None,
        }
    }

    /// Dotted change-log path, e.g. `$defs.Node`.
    pub fn path(&self) -> String {
        format!("{}.{}", self.container, self.name)
    }
}

impl fmt::Display for DefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Definitions and the `$ref` edges between them.
#[derive(Debug, Default)]
pub struct RefGraph {
    edges: BTreeMap<DefinitionRef, BTreeSet<DefinitionRef>>,
}

impl RefGraph {
    /// Build the graph from a root schema. References to definitions that
    /// do not exist produce no edge.
    pub fn build(schema: &Value) -> Self {
        let mut nodes: BTreeMap<DefinitionRef, &Value> = BTreeMap::new();
        for container in DEFINITION_CONTAINERS {
            if let Some(Value::Object(defs)) = schema.get(*container) {
                for (name, body) in defs {
                    nodes.insert(
                        DefinitionRef {
                            container: (*container).to_string(),
                            name: name.clone(),
                        },
                        body,
                    );
                }
            }
        }

        let edges = nodes
            .iter()
            .map(|(def, body)| {
                let mut targets = BTreeSet::new();
                collect_refs(body, &mut |target| {
                    if nodes.contains_key(&target) {
                        targets.insert(target);
                    }
                });
                (def.clone(), targets)
            })
            .collect();

        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn successors(&self, def: &DefinitionRef) -> impl Iterator<Item = &DefinitionRef> {
        self.edges.get(def).into_iter().flatten()
    }

    /// Find a cycle through `start`, returned as the walk
    /// `[start, ..., start]`.
    pub fn cycle_through(&self, start: &DefinitionRef) -> Option<Vec<DefinitionRef>> {
        let mut colors: BTreeMap<&DefinitionRef, Color> =
            self.edges.keys().map(|k| (k, Color::White)).collect();
        let mut path = Vec::new();
        if self.visit(start, start, &mut colors, &mut path) {
            path.push(start.clone());
            Some(path)
        } else {
            None
        }
    }

    /// Every definition that can reach itself, with one witnessing cycle.
    pub fn cycles(&self) -> BTreeMap<DefinitionRef, Vec<DefinitionRef>> {
        self.edges
            .keys()
            .filter_map(|def| self.cycle_through(def).map(|cycle| (def.clone(), cycle)))
            .collect()
    }

    fn visit<'a>(
        &'a self,
        node: &'a DefinitionRef,
        start: &DefinitionRef,
        colors: &mut BTreeMap<&'a DefinitionRef, Color>,
        path: &mut Vec<DefinitionRef>,
    ) -> bool {
        colors.insert(node, Color::Gray);
        path.push(node.clone());
        for next in self.successors(node) {
            if next == start {
                return true;
            }
            if colors.get(next).copied() == Some(Color::White)
                && self.visit(next, start, colors, path)
            {
                return true;
            }
        }
        colors.insert(node, Color::Black);
        path.pop();
        false
    }
}

/// Call `f` for every local definition `$ref` in a subschema position of
/// `value`. References inside `enum`, `const`, `default` or `examples` data
/// are not followed.
pub fn collect_refs(value: &Value, f: &mut impl FnMut(DefinitionRef)) {
    let Value::Object(map) = value else {
        return;
    };
    if let Some(target) = map
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(DefinitionRef::from_ref)
    {
        f(target);
    }
    for_each_subschema(map, |child| collect_refs(child, &mut *f));
}
