//! YAML event stream to `DocumentNode`.

use super::LineIndex;
use crate::error::LoadError;
use crate::models::document::{DocumentNode, MappingKey, NodeKind, ScalarHint};
use crate::models::SourceSpan;
use std::collections::{HashMap, HashSet};
use yaml_rust2::parser::{Event, Parser, Tag};
use yaml_rust2::scanner::{Marker, ScanError, TScalarStyle};

/// Nesting limit for collections.
const MAX_DEPTH: usize = 256;
/// Total nodes that alias expansion may copy into one document.
const MAX_ALIAS_NODES: usize = 100_000;

pub(super) fn parse(text: &str, lines: &LineIndex) -> Result<DocumentNode, LoadError> {
    let mut builder = Builder {
        parser: Parser::new_from_str(text),
        lines,
        anchors: HashMap::new(),
        expanded: 0,
    };
    builder.document()
}

/// A built node with the number of nodes it contains.
type Built = (DocumentNode, usize);

struct Builder<'t, 'l> {
    parser: Parser<std::str::Chars<'t>>,
    lines: &'l LineIndex<'l>,
    anchors: HashMap<usize, Built>,
    expanded: usize,
}

impl Builder<'_, '_> {
    fn next(&mut self) -> Result<(Event, Marker), LoadError> {
        self.parser
            .next_token()
            .map_err(|e| scan_error(&e, self.lines))
    }

    fn document(&mut self) -> Result<DocumentNode, LoadError> {
        let mut root: Option<DocumentNode> = None;
        loop {
            let (event, mark) = self.next()?;
            match event {
                Event::StreamEnd => break,
                Event::StreamStart | Event::DocumentStart | Event::DocumentEnd | Event::Nothing => {}
                event => {
                    if root.is_some() {
                        return Err(LoadError::syntax(
                            self.mark_span(mark),
                            "definition contains more than one YAML document",
                        ));
                    }
                    root = Some(self.node(event, mark, 0)?.0);
                }
            }
        }
        root.ok_or_else(|| LoadError::syntax(self.lines.span(1, 1), "document is empty"))
    }

    fn node(&mut self, event: Event, mark: Marker, depth: usize) -> Result<Built, LoadError> {
        if depth > MAX_DEPTH {
            return Err(LoadError::syntax(
                self.mark_span(mark),
                format!("nesting exceeds {MAX_DEPTH} levels"),
            ));
        }
        match event {
            Event::Scalar(value, style, anchor, tag) => {
                let hint = if style != TScalarStyle::Plain || is_str_tag(tag.as_ref()) {
                    ScalarHint::String
                } else {
                    ScalarHint::infer(&value)
                };
                let span = self.scalar_span(mark, &value, style);
                Ok(self.anchored(anchor, (DocumentNode::scalar(value, hint, span), 1)))
            }
            Event::SequenceStart(anchor, _) => {
                let mut items = Vec::new();
                let mut size = 1;
                let end = loop {
                    let (event, m) = self.next()?;
                    if event == Event::SequenceEnd {
                        break m;
                    }
                    let (item, n) = self.node(event, m, depth + 1)?;
                    size += n;
                    items.push(item);
                };
                let node = DocumentNode {
                    kind: NodeKind::Sequence(items),
                    span: self.collection_span(mark, end),
                };
                Ok(self.anchored(anchor, (node, size)))
            }
            Event::MappingStart(anchor, _) => {
                let mut entries: Vec<(MappingKey, DocumentNode)> = Vec::new();
                let mut seen = HashSet::new();
                let mut size = 1;
                let end = loop {
                    let (event, m) = self.next()?;
                    if event == Event::MappingEnd {
                        break m;
                    }
                    let (key_node, _) = self.node(event, m, depth + 1)?;
                    let key = MappingKey {
                        name: key_text(&key_node),
                        span: key_node.span,
                    };
                    if !seen.insert(key.name.clone()) {
                        return Err(LoadError::duplicate_key(key.span, &key.name));
                    }
                    let (event, m) = self.next()?;
                    let (value, n) = self.node(event, m, depth + 1)?;
                    size += n;
                    entries.push((key, value));
                };
                let node = DocumentNode {
                    kind: NodeKind::Mapping(entries),
                    span: self.collection_span(mark, end),
                };
                Ok(self.anchored(anchor, (node, size)))
            }
            Event::Alias(id) => {
                let Some(size) = self.anchors.get(&id).map(|(_, n)| *n) else {
                    return Err(LoadError::syntax(
                        self.mark_span(mark),
                        "alias refers to an anchor whose node is not complete",
                    ));
                };
                if self.expanded + size > MAX_ALIAS_NODES {
                    return Err(LoadError::syntax(
                        self.mark_span(mark),
                        format!("aliases expand to more than {MAX_ALIAS_NODES} nodes"),
                    ));
                }
                self.expanded += size;
                let span = self.mark_span(mark);
                let mut node = self.anchors[&id].0.clone();
                node.span = span;
                Ok((node, size))
            }
            other => Err(LoadError::syntax(
                self.mark_span(mark),
                format!("unexpected YAML event {other:?}"),
            )),
        }
    }

    fn anchored(&mut self, anchor: usize, built: Built) -> Built {
        if anchor != 0 {
            self.anchors.insert(anchor, built.clone());
        }
        built
    }

    fn mark_span(&self, mark: Marker) -> SourceSpan {
        self.lines.span(mark.line() as u32, mark.col() as u32 + 1)
    }

    fn scalar_span(&self, mark: Marker, value: &str, style: TScalarStyle) -> SourceSpan {
        let (line, column) = (mark.line() as u32, mark.col() as u32 + 1);
        let start = self.lines.offset(line, column);
        let quotes = match style {
            TScalarStyle::SingleQuoted | TScalarStyle::DoubleQuoted => 2,
            _ => 0,
        };
        let end = self.lines.clamp(start + value.len() + quotes);
        SourceSpan::new(line.max(1), column, start, end)
    }

    fn collection_span(&self, start: Marker, end: Marker) -> SourceSpan {
        let (line, column) = (start.line() as u32, start.col() as u32 + 1);
        let begin = self.lines.offset(line, column);
        let finish = self.lines.offset(end.line() as u32, end.col() as u32 + 1);
        SourceSpan::new(line.max(1), column, begin, finish)
    }
}

fn scan_error(e: &ScanError, lines: &LineIndex) -> LoadError {
    let mark = e.marker();
    LoadError::syntax(
        lines.span(mark.line() as u32, mark.col() as u32 + 1),
        e.info().to_string(),
    )
}

fn is_str_tag(tag: Option<&Tag>) -> bool {
    tag.is_some_and(|t| {
        t.suffix == "str" && (t.handle == "!!" || t.handle.starts_with("tag:yaml.org,2002:"))
    })
}

/// Key name for a mapping key; collection keys use flow notation.
fn key_text(node: &DocumentNode) -> String {
    match &node.kind {
        NodeKind::Scalar { value, .. } => value.clone(),
        NodeKind::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(key_text).collect();
            format!("[{}]", parts.join(", "))
        }
        NodeKind::Mapping(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k.name, key_text(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}
