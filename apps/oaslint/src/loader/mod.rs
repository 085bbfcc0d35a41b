//! Document loader: definition text to span-carrying `DocumentNode` tree.
//!
//! JSON is detected by a syntactic probe (trimmed text starts with `{` or
//! `[`). It is validated strictly with `serde_json` so syntax errors point at
//! the offending token, then walked once more to record spans. Everything
//! else is read from the `yaml-rust2` event stream: anchors are expanded at
//! each alias and tags are accepted.
//!
//! Both builders reject a mapping key that repeats an earlier key of the same
//! mapping, reporting the span of the repeat.
//!
//! Works on the supplied text only; `$ref` targets are never fetched.

mod json;
mod yaml;

use crate::error::LoadError;
use crate::models::document::DocumentNode;
use crate::models::SourceSpan;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

/// Syntactic format probe.
pub fn detect_format(text: &str) -> Format {
    let t = text.trim_start_matches('\u{feff}').trim_start();
    if t.starts_with('{') || t.starts_with('[') {
        Format::Json
    } else {
        Format::Yaml
    }
}

/// Parse `text` into a document tree.
pub fn load(text: &str) -> Result<DocumentNode, LoadError> {
    let lines = LineIndex::new(text);
    if text.trim_start_matches('\u{feff}').trim().is_empty() {
        return Err(LoadError::syntax(lines.span(1, 1), "document is empty"));
    }

    let format = detect_format(text);
    debug!(?format, bytes = text.len(), "loading definition");
    let root = match format {
        Format::Json => json::parse(text, &lines)?,
        Format::Yaml => yaml::parse(text, &lines)?,
    };
    if !root.is_mapping() {
        return Err(LoadError::syntax(
            root.span,
            format!("document root must be a mapping, found a {}", root.kind_name()),
        ));
    }
    Ok(root)
}

/// Maps between byte offsets and 1-based line/column (in characters).
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    pub(crate) fn offset(&self, line: u32, column: u32) -> usize {
        let line_idx = (line.max(1) as usize - 1).min(self.starts.len() - 1);
        let start = self.starts[line_idx];
        let end = self
            .starts
            .get(line_idx + 1)
            .copied()
            .unwrap_or(self.text.len());
        let line_text = &self.text[start..end];
        let col = column.max(1) as usize - 1;
        let within = line_text
            .char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line_text.len());
        start + within
    }

    /// Line and column of a byte offset on a char boundary.
    pub(crate) fn position(&self, offset: usize) -> (u32, u32) {
        let offset = self.clamp(offset);
        let line_idx = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let column = self.text[self.starts[line_idx]..offset].chars().count() + 1;
        (line_idx as u32 + 1, column as u32)
    }

    /// One-character span at a line/column.
    pub(crate) fn span(&self, line: u32, column: u32) -> SourceSpan {
        let start = self.offset(line, column);
        let end = self.text[start..]
            .char_indices()
            .nth(1)
            .map(|(i, _)| start + i)
            .unwrap_or(self.text.len());
        SourceSpan::new(line.max(1), column.max(1), start, end)
    }

    pub(crate) fn byte_span(&self, start: usize, end: usize) -> SourceSpan {
        let (line, column) = self.position(start);
        SourceSpan::new(line, column, self.clamp(start), self.clamp(end))
    }

    /// Largest char boundary not past `offset`.
    pub(crate) fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
