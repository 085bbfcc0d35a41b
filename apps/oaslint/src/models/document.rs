//! Generic document tree produced by the loader.
//!
//! Every node keeps the `SourceSpan` it was read from. Mapping entries keep
//! their source order and the span of the key itself.

use super::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Best-effort type of a scalar as written.
pub enum ScalarHint {
    Null,
    Bool,
    Int,
    Float,
    String,
}

impl ScalarHint {
    /// Classify an unquoted scalar using YAML 1.2 core schema spellings.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "" | "~" | "null" | "Null" | "NULL" => return ScalarHint::Null,
            "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return ScalarHint::Bool,
            _ => {}
        }
        if raw.parse::<i64>().is_ok() {
            ScalarHint::Int
        } else if raw.parse::<f64>().is_ok() && raw.chars().any(|c| c.is_ascii_digit()) {
            ScalarHint::Float
        } else {
            ScalarHint::String
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingKey {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar { value: String, hint: ScalarHint },
    Sequence(Vec<DocumentNode>),
    Mapping(Vec<(MappingKey, DocumentNode)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub kind: NodeKind,
    pub span: SourceSpan,
}

impl DocumentNode {
    pub fn scalar(value: impl Into<String>, hint: ScalarHint, span: SourceSpan) -> Self {
        Self {
            kind: NodeKind::Scalar {
                value: value.into(),
                hint,
            },
            span,
        }
    }

    /// Scalar text; `None` for nulls and collections.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar {
                hint: ScalarHint::Null,
                ..
            } => None,
            NodeKind::Scalar { value, .. } => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            NodeKind::Scalar {
                value,
                hint: ScalarHint::Bool,
            } => Some(value.eq_ignore_ascii_case("true")),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[DocumentNode]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(MappingKey, DocumentNode)]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, NodeKind::Mapping(_))
    }

    /// Value for `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&DocumentNode> {
        self.entry(key).map(|(_, v)| v)
    }

    /// Key and value for `key` when this node is a mapping.
    pub fn entry(&self, key: &str) -> Option<(&MappingKey, &DocumentNode)> {
        self.entries()?
            .iter()
            .find(|(k, _)| k.name == key)
            .map(|(k, v)| (k, v))
    }

    /// `$ref` target when this node is a reference object.
    pub fn reference(&self) -> Option<&str> {
        self.get("$ref").and_then(DocumentNode::as_str)
    }

    /// Short name of the node kind for messages.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
        }
    }

    /// Resolve a document-local JSON Pointer (`#/a/b/0`).
    ///
    /// Returns `None` for external pointers or missing targets.
    pub fn pointer(&self, pointer: &str) -> Option<&DocumentNode> {
        let path = pointer.strip_prefix('#')?;
        if path.is_empty() {
            return Some(self);
        }
        let path = path.strip_prefix('/')?;
        let mut cur = self;
        for raw in path.split('/') {
            let token = unescape_pointer_token(raw);
            cur = match &cur.kind {
                NodeKind::Mapping(_) => cur.get(&token)?,
                NodeKind::Sequence(items) => items.get(token.parse::<usize>().ok()?)?,
                NodeKind::Scalar { .. } => return None,
            };
        }
        Some(cur)
    }
}

/// Decode `~1` and `~0` in one pointer segment (RFC 6901 order) and
/// percent-escapes commonly found in URI fragments.
pub fn unescape_pointer_token(raw: &str) -> String {
    let decoded = percent_decode(raw);
    decoded.replace("~1", "/").replace("~0", "~")
}

fn percent_decode(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.to_string();
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = decoded {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| raw.to_string())
}
