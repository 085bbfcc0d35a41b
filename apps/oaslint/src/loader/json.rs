//! JSON text to `DocumentNode`.
//!
//! `serde_json` validates the text first. The walker below then only has to
//! record spans and catch repeated keys, which `serde_json` accepts.

use super::LineIndex;
use crate::error::LoadError;
use crate::models::document::{DocumentNode, MappingKey, NodeKind, ScalarHint};
use std::collections::HashSet;

pub(super) fn parse(text: &str, lines: &LineIndex) -> Result<DocumentNode, LoadError> {
    let bom = if text.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
    if let Err(e) = serde_json::from_str::<serde::de::IgnoredAny>(&text[bom..]) {
        let column = e.column() as u32 + u32::from(bom > 0 && e.line() == 1);
        let span = lines.span(e.line() as u32, column);
        return Err(LoadError::syntax(span, e.to_string()));
    }
    let mut walker = Walker {
        text,
        bytes: text.as_bytes(),
        pos: bom,
        lines,
    };
    walker.skip_ws();
    walker.value()
}

struct Walker<'t, 'l> {
    text: &'t str,
    bytes: &'t [u8],
    pos: usize,
    lines: &'l LineIndex<'l>,
}

impl Walker<'_, '_> {
    fn value(&mut self) -> Result<DocumentNode, LoadError> {
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => {
                let (value, start, end) = self.string()?;
                Ok(DocumentNode::scalar(
                    value,
                    ScalarHint::String,
                    self.lines.byte_span(start, end),
                ))
            }
            Some(_) => Ok(self.literal()),
            None => Err(self.unexpected()),
        }
    }

    fn object(&mut self) -> Result<DocumentNode, LoadError> {
        let start = self.pos;
        self.pos += 1;
        let mut entries: Vec<(MappingKey, DocumentNode)> = Vec::new();
        let mut seen = HashSet::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
        } else {
            loop {
                self.skip_ws();
                let (name, key_start, key_end) = self.string()?;
                let key = MappingKey {
                    name,
                    span: self.lines.byte_span(key_start, key_end),
                };
                if !seen.insert(key.name.clone()) {
                    return Err(LoadError::duplicate_key(key.span, &key.name));
                }
                self.skip_ws();
                self.expect(b':')?;
                self.skip_ws();
                let value = self.value()?;
                entries.push((key, value));
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b'}') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.unexpected()),
                }
            }
        }
        Ok(DocumentNode {
            kind: NodeKind::Mapping(entries),
            span: self.lines.byte_span(start, self.pos),
        })
    }

    fn array(&mut self) -> Result<DocumentNode, LoadError> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                self.skip_ws();
                items.push(self.value()?);
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b']') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.unexpected()),
                }
            }
        }
        Ok(DocumentNode {
            kind: NodeKind::Sequence(items),
            span: self.lines.byte_span(start, self.pos),
        })
    }

    /// Decoded string token with its byte range, quotes included.
    fn string(&mut self) -> Result<(String, usize, usize), LoadError> {
        let start = self.pos;
        self.expect(b'"')?;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'"' => {
                    let raw = &self.text[start..self.pos];
                    let value = serde_json::from_str::<String>(raw).map_err(|e| {
                        LoadError::syntax(self.lines.byte_span(start, self.pos), e.to_string())
                    })?;
                    return Ok((value, start, self.pos));
                }
                _ => {}
            }
        }
        Err(self.unexpected())
    }

    /// Number, `true`, `false` or `null`.
    fn literal(&mut self) -> DocumentNode {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b',' | b']' | b'}') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        let raw = &self.text[start..self.pos];
        let hint = match raw {
            "true" | "false" => ScalarHint::Bool,
            "null" => ScalarHint::Null,
            _ if raw.contains(['.', 'e', 'E']) => ScalarHint::Float,
            _ => ScalarHint::Int,
        };
        DocumentNode::scalar(raw, hint, self.lines.byte_span(start, self.pos))
    }

    fn expect(&mut self, byte: u8) -> Result<(), LoadError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> LoadError {
        let start = self.lines.clamp(self.pos);
        LoadError::syntax(self.lines.byte_span(start, start + 1), "unexpected JSON token")
    }
}

#[cfg(test)]
mod tests {
    use crate::error::LoadErrorKind;
    use crate::loader::load;
    use crate::models::document::{NodeKind, ScalarHint};

    #[test]
    fn test_load_json_input() {
        let text = "{\n  \"openapi\": \"3.0.0\",\n  \"paths\": {\"/a\": {\"get\": {\"operationId\": \"x\"}}}\n}";
        let root = load(text).unwrap();
        assert_eq!(root.get("openapi").and_then(|n| n.as_str()), Some("3.0.0"));
        assert!(root.pointer("#/paths/~1a").unwrap().is_mapping());
        let (key, _) = root.entry("paths").unwrap();
        assert_eq!((key.span.line, key.span.column), (3, 3));
        assert_eq!(&text[key.span.start..key.span.end], "\"paths\"");
        let op_id = root.pointer("#/paths/~1a/get/operationId").unwrap();
        assert_eq!(op_id.span.line, 3);
        assert_eq!(&text[op_id.span.start..op_id.span.end], "\"x\"");
    }

    #[test]
    fn test_malformed_json_points_at_token() {
        let err = load("{\n  \"openapi\": \"3.0.0\",\n  \"paths\": ]\n}").unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Syntax);
        assert_eq!(err.span.line, 3);
    }

    #[test]
    fn test_duplicate_json_key_reports_the_repeat() {
        let err = load(r#"{"openapi":"3.0.0","openapi":"3.1.0"}"#).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::DuplicateKey);
        assert!(err.message.contains("openapi"));
        assert_eq!((err.span.line, err.span.column), (1, 20));

        // Escapes are decoded before comparing.
        let err = load(r#"{"a":1,"\u0061":2}"#).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::DuplicateKey);
    }

    #[test]
    fn test_long_json_keys_are_accepted() {
        let key = format!("x-{}", "k".repeat(1100));
        let text = format!(r#"{{"openapi":"3.0.0","{key}":1,"paths":{{}}}}"#);
        let root = load(&text).unwrap();
        assert!(root.get(&key).is_some());
        assert!(root.get("paths").unwrap().is_mapping());
    }

    #[test]
    fn test_json_scalar_hints() {
        let root = load(r#"{"s":"200","i":200,"f":1.5e3,"b":false,"n":null,"u":"ünï"}"#).unwrap();
        let hint = |k: &str| match &root.get(k).unwrap().kind {
            NodeKind::Scalar { hint, .. } => *hint,
            other => panic!("expected scalar, got {other:?}"),
        };
        assert_eq!(hint("s"), ScalarHint::String);
        assert_eq!(hint("i"), ScalarHint::Int);
        assert_eq!(hint("f"), ScalarHint::Float);
        assert_eq!(hint("b"), ScalarHint::Bool);
        assert_eq!(hint("n"), ScalarHint::Null);
        assert_eq!(root.get("u").and_then(|n| n.as_str()), Some("ünï"));
    }

    #[test]
    fn test_byte_order_mark_is_skipped() {
        let root = load("\u{feff}{\"openapi\":\"3.1.0\",\"paths\":{}}").unwrap();
        assert_eq!(root.get("openapi").and_then(|n| n.as_str()), Some("3.1.0"));
    }
}
