//! Normalized OpenAPI model.
//!
//! Schemas live in a single arena (`SchemaArena`) and refer to each other by
//! `SchemaId`. A `$ref` becomes a `SchemaKind::Ref` holding the id of its
//! target, so cyclic references are plain back-edges rather than owned
//! recursion.

use super::SourceSpan;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Upper bound for `$ref` chains and schema nesting during normalization.
pub const MAX_REF_DEPTH: usize = 64;

/// Version assumed when the document declares none.
pub const DEFAULT_OPENAPI_VERSION: &str = "3.1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// Reference to another schema; `target` is `None` when unresolved.
    Ref {
        pointer: String,
        target: Option<SchemaId>,
    },
    Object {
        properties: Vec<(String, SchemaId)>,
        additional: Option<SchemaId>,
    },
    Array {
        items: Option<SchemaId>,
    },
    /// `allOf` / `anyOf` / `oneOf` / `not` members.
    Composite {
        members: Vec<SchemaId>,
    },
    Primitive {
        type_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub span: SourceSpan,
    pub kind: SchemaKind,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    nodes: Vec<Schema>,
}

impl SchemaArena {
    pub fn alloc(&mut self, span: SourceSpan) -> SchemaId {
        self.nodes.push(Schema {
            span,
            kind: SchemaKind::Primitive { type_name: None },
        });
        SchemaId(self.nodes.len() - 1)
    }

    pub fn set_kind(&mut self, id: SchemaId, kind: SchemaKind) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.kind = kind;
        }
    }

    pub fn get(&self, id: SchemaId) -> Option<&Schema> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct successors of `id`, including a resolved ref target.
    pub fn children(&self, id: SchemaId) -> Vec<SchemaId> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        match &node.kind {
            SchemaKind::Ref { target, .. } => target.iter().copied().collect(),
            SchemaKind::Object {
                properties,
                additional,
            } => properties
                .iter()
                .map(|(_, id)| *id)
                .chain(additional.iter().copied())
                .collect(),
            SchemaKind::Array { items } => items.iter().copied().collect(),
            SchemaKind::Composite { members } => members.clone(),
            SchemaKind::Primitive { .. } => Vec::new(),
        }
    }

    /// Every schema reachable from `roots`. Visits each node once, so
    /// cycles terminate.
    pub fn reachable(&self, roots: impl IntoIterator<Item = SchemaId>) -> HashSet<SchemaId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<SchemaId> = roots.into_iter().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            stack.extend(self.children(id));
        }
        seen
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Named entry under `components.schemas` (or `definitions` in Swagger 2).
pub struct ComponentSchema {
    pub name: String,
    pub pointer: String,
    pub span: SourceSpan,
    pub schema: SchemaId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "get" => HttpMethod::Get,
            "put" => HttpMethod::Put,
            "post" => HttpMethod::Post,
            "delete" => HttpMethod::Delete,
            "options" => HttpMethod::Options,
            "head" => HttpMethod::Head,
            "patch" => HttpMethod::Patch,
            "trace" => HttpMethod::Trace,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    Other(String),
}

impl ParamLocation {
    pub fn parse(s: &str) -> Self {
        match s {
            "path" => ParamLocation::Path,
            "query" => ParamLocation::Query,
            "header" => ParamLocation::Header,
            "cookie" => ParamLocation::Cookie,
            other => ParamLocation::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Option<SchemaId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
/// One media type entry of a request body or response.
pub struct MediaType {
    pub name: String,
    pub schema: Option<SchemaId>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status key as written: `200`, `2XX`, `default`.
    pub status: String,
    pub span: SourceSpan,
    pub content: Vec<MediaType>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        let s = self.status.as_bytes();
        s.len() == 3 && s[0] == b'2'
    }

    pub fn has_schema(&self) -> bool {
        self.content.iter().any(|m| m.schema.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationId {
    pub value: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: HttpMethod,
    pub span: SourceSpan,
    pub operation_id: Option<OperationId>,
    pub parameters: Vec<Parameter>,
    pub request_body: Vec<MediaType>,
    pub responses: Vec<Response>,
}

impl Operation {
    /// Schemas referenced directly by this operation.
    pub fn schema_roots(&self) -> impl Iterator<Item = SchemaId> + '_ {
        self.parameters
            .iter()
            .filter_map(|p| p.schema)
            .chain(self.request_body.iter().filter_map(|m| m.schema))
            .chain(
                self.responses
                    .iter()
                    .flat_map(|r| r.content.iter().filter_map(|m| m.schema)),
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathItem {
    pub template: String,
    pub span: SourceSpan,
    pub parameters: Vec<Parameter>,
    pub operations: Vec<Operation>,
}

impl PathItem {
    /// `GET /items/{id}` style label used as finding location.
    pub fn label(&self, op: &Operation) -> String {
        format!("{} {}", op.method, self.template)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    UnresolvedReference,
    MissingVersion,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
/// Malformed or unrecognized fragment recorded during normalization.
pub struct StructuralAnomaly {
    pub kind: AnomalyKind,
    pub location: String,
    pub message: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Default)]
pub struct OpenApiDocument {
    /// Declared version, or `DEFAULT_OPENAPI_VERSION` when missing.
    pub version: String,
    pub version_declared: bool,
    pub paths: Vec<PathItem>,
    pub components: Vec<ComponentSchema>,
    pub schemas: SchemaArena,
    pub anomalies: Vec<StructuralAnomaly>,
}

impl OpenApiDocument {
    pub fn is_swagger2(&self) -> bool {
        self.version.starts_with('2')
    }

    pub fn operations(&self) -> impl Iterator<Item = (&PathItem, &Operation)> {
        self.paths
            .iter()
            .flat_map(|p| p.operations.iter().map(move |op| (p, op)))
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSchema> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Names of components reachable from any operation, through any
    /// chain of references.
    pub fn used_components(&self) -> BTreeSet<String> {
        let roots: Vec<SchemaId> = self
            .operations()
            .flat_map(|(path, op)| {
                path.parameters
                    .iter()
                    .filter_map(|p| p.schema)
                    .chain(op.schema_roots())
                    .collect::<Vec<_>>()
            })
            .collect();
        let reachable = self.schemas.reachable(roots);
        self.components
            .iter()
            .filter(|c| reachable.contains(&c.schema))
            .map(|c| c.name.clone())
            .collect()
    }
}
