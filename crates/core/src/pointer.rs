//! RFC 6901 JSON Pointers over schemas and documents.
//!
//! A [`JsonPointer`] is an ordered list of unescaped reference tokens. The
//! same vocabulary addresses locations inside a JSON Schema (where the
//! tokens include keywords like `properties` and `items`) and inside the
//! document that schema describes. [`JsonPointer::document_target`]
//! translates the former into the latter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PointerError;

/// Upper bound on `$ref` hops followed while descending a single segment.
const MAX_REF_HOPS: usize = 16;

/// A parsed JSON Pointer. The empty pointer denotes the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// The root pointer (`""`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from already-unescaped tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the RFC 6901 string form.
    pub fn parse(s: &str) -> Result<Self, PointerError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PointerError::Syntax { pointer: s.into() });
        };
        let tokens = rest
            .split('/')
            .map(|raw| {
                unescape(raw).ok_or_else(|| PointerError::InvalidEscape { pointer: s.into() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The final reference token, if any.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// The pointer with its final token removed (`None` for the root).
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    /// A new pointer with `token` appended.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// Token-wise strict prefix test: `/a/b` prefixes `/a/b/c` but not
    /// `/a/bc`, and no pointer is a strict prefix of itself.
    pub fn is_strict_prefix_of(&self, other: &JsonPointer) -> bool {
        self.tokens.len() < other.tokens.len() && other.tokens.starts_with(&self.tokens)
    }

    /// Resolve this pointer inside `root`.
    ///
    /// Objects are descended by key and arrays by index. When an object
    /// lacks the requested key but carries a local `$ref`, descent continues
    /// through the referenced schema so pointers may cross reusable
    /// definitions.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<&'a Value, PointerError> {
        let mut current = root;
        for token in &self.tokens {
            current = step(root, current, token).ok_or_else(|| PointerError::Unresolvable {
                pointer: self.to_string(),
                segment: token.clone(),
            })?;
        }
        Ok(current)
    }

    /// Map a schema pointer to the location it fills in an instance
    /// document.
    ///
    /// `properties` keywords are dropped (`/properties/a/properties/b` →
    /// `/a/b`), `prefixItems/<n>` becomes an array index, and a trailing
    /// `items` targets the enclosing array as a whole. A trailing
    /// `properties` targets the object that owns it.
    pub fn document_target(&self) -> Result<DocumentTarget, PointerError> {
        let not_addressable = |reason: String| PointerError::NotAddressable {
            pointer: self.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut array_items = false;
        let mut tokens = self.tokens.iter().peekable();
        while let Some(token) = tokens.next() {
            match token.as_str() {
                "properties" => {
                    if let Some(name) = tokens.next() {
                        segments.push(TargetSegment::Key(name.clone()));
                    }
                }
                "prefixItems" => match tokens.next().and_then(|t| parse_index(t)) {
                    Some(index) => segments.push(TargetSegment::Index(index)),
                    None => {
                        return Err(not_addressable(
                            "'prefixItems' must be followed by an array index".into(),
                        ));
                    }
                },
                "items" if tokens.peek().is_none() => array_items = true,
                "items" => {
                    return Err(not_addressable(
                        "'items' may only appear as the final segment".into(),
                    ));
                }
                other => {
                    return Err(not_addressable(format!(
                        "keyword '{other}' has no document counterpart"
                    )));
                }
            }
        }

        Ok(DocumentTarget {
            segments,
            array_items,
        })
    }
}

/// One step of a [`DocumentTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSegment {
    /// An object member
    Key(String),
    /// An array element
    Index(usize),
}

/// Where a schema pointer's value lands in the assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTarget {
    /// Location inside the document; empty means "merge into the root".
    pub segments: Vec<TargetSegment>,
    /// The pointer named an `items` schema, so the value fills the whole
    /// array at this location.
    pub array_items: bool,
}

impl DocumentTarget {
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether one location is equal to or nested inside the other. An
    /// `items` target covers every index of its array.
    pub fn overlaps(&self, other: &DocumentTarget) -> bool {
        let shared = self.segments.len().min(other.segments.len());
        self.segments[..shared] == other.segments[..shared]
    }

    /// The target as an instance pointer, e.g. `/pair/1`.
    pub fn path(&self) -> JsonPointer {
        JsonPointer {
            tokens: self
                .segments
                .iter()
                .map(|segment| match segment {
                    TargetSegment::Key(key) => key.clone(),
                    TargetSegment::Index(index) => index.to_string(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse an RFC 6901 array index (`0` or a digit string without leading
/// zeros).
pub fn parse_index(token: &str) -> Option<usize> {
    let valid = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if valid { token.parse().ok() } else { None }
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn step<'a>(root: &'a Value, node: &'a Value, token: &str) -> Option<&'a Value> {
    let mut node = node;
    for _ in 0..=MAX_REF_HOPS {
        match node {
            Value::Object(map) => {
                if let Some(child) = map.get(token) {
                    return Some(child);
                }
                let target = map.get("$ref")?.as_str()?.strip_prefix('#')?;
                node = descend_plain(root, &JsonPointer::parse(target).ok()?)?;
            }
            Value::Array(items) => return items.get(parse_index(token)?),
            _ => return None,
        }
    }
    None
}

fn descend_plain<'a>(root: &'a Value, pointer: &JsonPointer) -> Option<&'a Value> {
    pointer.tokens.iter().try_fold(root, |node, token| match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => items.get(parse_index(token)?),
        _ => None,
    })
}
