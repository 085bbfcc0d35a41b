//! Schema normalizer: generic `DocumentNode` tree to `OpenApiDocument`.
//!
//! Normalization never fails. Anything malformed or unresolvable is
//! recorded as a `StructuralAnomaly` and the walk continues with whatever
//! structure could be recovered.
//!
//! `$ref` handling:
//! - Only document-local pointers (`#/...`) are followed.
//! - Component schemas are allocated up front, so references to them (and
//!   between them) resolve to the same `SchemaId` regardless of order.
//! - Any other in-document schema target is allocated on first use and
//!   memoized by pointer before it is filled, which turns cycles into
//!   back-edges.
//! - Reference chains and nesting are capped at `MAX_REF_DEPTH`.

use crate::models::document::DocumentNode;
use crate::models::openapi::{
    AnomalyKind, ComponentSchema, HttpMethod, MediaType, OpenApiDocument, Operation,
    OperationId, ParamLocation, Parameter, PathItem, Response, SchemaId, SchemaKind,
    StructuralAnomaly, DEFAULT_OPENAPI_VERSION, MAX_REF_DEPTH,
};
use crate::models::SourceSpan;
use std::collections::HashMap;
use tracing::debug;

const PATH_ITEM_FIELDS: &[&str] = &["$ref", "summary", "description", "servers", "parameters"];

/// Build the normalized view of `root`. Anomalies are stored on the
/// returned document.
pub fn normalize(root: &DocumentNode) -> OpenApiDocument {
    let mut n = Normalizer {
        root,
        doc: OpenApiDocument::default(),
        by_pointer: HashMap::new(),
    };
    n.version();
    n.components();
    n.paths();
    debug!(
        paths = n.doc.paths.len(),
        components = n.doc.components.len(),
        schemas = n.doc.schemas.len(),
        anomalies = n.doc.anomalies.len(),
        "normalized document"
    );
    n.doc
}

/// Encode one JSON Pointer segment.
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

struct Normalizer<'a> {
    root: &'a DocumentNode,
    doc: OpenApiDocument,
    by_pointer: HashMap<String, SchemaId>,
}

impl<'a> Normalizer<'a> {
    fn anomaly(
        &mut self,
        kind: AnomalyKind,
        location: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) {
        self.doc.anomalies.push(StructuralAnomaly {
            kind,
            location: location.into(),
            message: message.into(),
            span,
        });
    }

    fn version(&mut self) {
        let root = self.root;
        let declared = root.entry("openapi").or_else(|| root.entry("swagger"));
        match declared {
            Some((key, value)) => match value.as_str().filter(|v| !v.is_empty()) {
                Some(v) => {
                    self.doc.version = v.to_string();
                    self.doc.version_declared = true;
                    if !(v.starts_with("2.") || v.starts_with("3.")) {
                        self.anomaly(
                            AnomalyKind::Other,
                            format!("#/{}", key.name),
                            format!("unsupported {} version \"{v}\"", key.name),
                            value.span,
                        );
                    }
                }
                None => {
                    self.doc.version = DEFAULT_OPENAPI_VERSION.to_string();
                    self.anomaly(
                        AnomalyKind::MissingVersion,
                        format!("#/{}", key.name),
                        format!(
                            "`{}` must be a version string; assuming {DEFAULT_OPENAPI_VERSION}",
                            key.name
                        ),
                        value.span,
                    );
                }
            },
            None => {
                self.doc.version = DEFAULT_OPENAPI_VERSION.to_string();
                self.anomaly(
                    AnomalyKind::MissingVersion,
                    "#",
                    format!(
                        "document declares neither `openapi` nor `swagger`; assuming {DEFAULT_OPENAPI_VERSION}"
                    ),
                    root.span,
                );
            }
        }
    }

    fn components(&mut self) {
        let prefix = if self.doc.is_swagger2() {
            "#/definitions"
        } else {
            "#/components/schemas"
        };
        let root = self.root;
        let Some(section) = root.pointer(prefix) else {
            return;
        };
        let Some(entries) = section.entries() else {
            self.anomaly(
                AnomalyKind::Other,
                prefix,
                format!("expected a mapping of schemas, found a {}", section.kind_name()),
                section.span,
            );
            return;
        };

        let mut pending = Vec::with_capacity(entries.len());
        for (key, node) in entries {
            let pointer = format!("{prefix}/{}", escape_pointer_token(&key.name));
            let id = self.doc.schemas.alloc(node.span);
            self.by_pointer.insert(pointer.clone(), id);
            self.doc.components.push(ComponentSchema {
                name: key.name.clone(),
                pointer: pointer.clone(),
                span: key.span,
                schema: id,
            });
            pending.push((id, node, pointer));
        }
        for (id, node, pointer) in pending {
            self.fill_schema(id, node, &pointer, 0);
        }
    }

    fn paths(&mut self) {
        let root = self.root;
        let Some(paths) = root.get("paths") else {
            return;
        };
        let Some(entries) = paths.entries() else {
            self.anomaly(
                AnomalyKind::Other,
                "#/paths",
                format!("expected a mapping of path items, found a {}", paths.kind_name()),
                paths.span,
            );
            return;
        };
        for (key, node) in entries {
            if key.name.starts_with("x-") {
                continue;
            }
            if !key.name.starts_with('/') {
                self.anomaly(
                    AnomalyKind::Other,
                    key.name.clone(),
                    format!("path template \"{}\" must start with '/'", key.name),
                    key.span,
                );
            }
            let Some(item) = self.deref(node, &key.name) else {
                continue;
            };
            let path = self.path_item(&key.name, key.span, item);
            self.doc.paths.push(path);
        }
    }

    fn path_item(&mut self, template: &str, span: SourceSpan, item: &'a DocumentNode) -> PathItem {
        let mut path = PathItem {
            template: template.to_string(),
            span,
            parameters: Vec::new(),
            operations: Vec::new(),
        };
        let Some(entries) = item.entries() else {
            self.anomaly(
                AnomalyKind::Other,
                template,
                format!("path item must be a mapping, found a {}", item.kind_name()),
                item.span,
            );
            return path;
        };
        if let Some(params) = item.get("parameters") {
            path.parameters = self.parameters(params, template);
        }
        for (key, value) in entries {
            if let Some(method) = HttpMethod::parse(&key.name) {
                let label = format!("{method} {template}");
                if let Some(op) = self.operation(method, key.span, value, &label) {
                    path.operations.push(op);
                }
            } else if !PATH_ITEM_FIELDS.contains(&key.name.as_str()) && !key.name.starts_with("x-") {
                self.anomaly(
                    AnomalyKind::Other,
                    template,
                    format!("unrecognized path item field \"{}\"", key.name),
                    key.span,
                );
            }
        }
        path
    }

    fn operation(
        &mut self,
        method: HttpMethod,
        span: SourceSpan,
        node: &'a DocumentNode,
        label: &str,
    ) -> Option<Operation> {
        if !node.is_mapping() {
            self.anomaly(
                AnomalyKind::Other,
                label,
                format!("operation must be a mapping, found a {}", node.kind_name()),
                node.span,
            );
            return None;
        }

        let operation_id = match node.get("operationId") {
            Some(v) => match v.as_str().filter(|s| !s.is_empty()) {
                Some(s) => Some(OperationId {
                    value: s.to_string(),
                    span: v.span,
                }),
                None => {
                    self.anomaly(
                        AnomalyKind::Other,
                        label,
                        "operationId must be a non-empty string",
                        v.span,
                    );
                    None
                }
            },
            None => None,
        };

        let mut parameters = match node.get("parameters") {
            Some(params) => self.parameters(params, label),
            None => Vec::new(),
        };

        let mut request_body = Vec::new();
        if let Some(body) = node.get("requestBody") {
            if let Some(body) = self.deref(body, label) {
                request_body = self.content(body, label);
            }
        }
        // Swagger 2 carries the body as an `in: body` parameter.
        parameters.retain(|p| {
            if p.location == ParamLocation::Other("body".into()) {
                request_body.push(MediaType {
                    name: "body".into(),
                    schema: p.schema,
                    span: p.span,
                });
                false
            } else {
                true
            }
        });

        let responses = match node.entry("responses") {
            Some((_, responses)) => self.responses(responses, label),
            None => {
                self.anomaly(
                    AnomalyKind::Other,
                    label,
                    "operation declares no responses",
                    span,
                );
                Vec::new()
            }
        };

        Some(Operation {
            method,
            span,
            operation_id,
            parameters,
            request_body,
            responses,
        })
    }

    fn parameters(&mut self, node: &'a DocumentNode, ctx: &str) -> Vec<Parameter> {
        let Some(items) = node.as_sequence() else {
            self.anomaly(
                AnomalyKind::Other,
                ctx,
                format!("parameters must be a sequence, found a {}", node.kind_name()),
                node.span,
            );
            return Vec::new();
        };
        let mut out = Vec::new();
        for item in items {
            let Some(param) = self.deref(item, ctx) else {
                continue;
            };
            let name = param.get("name").and_then(DocumentNode::as_str);
            let location = param.get("in").and_then(DocumentNode::as_str);
            let (Some(name), Some(location)) = (name, location) else {
                self.anomaly(
                    AnomalyKind::Other,
                    ctx,
                    "parameter requires both `name` and `in`",
                    item.span,
                );
                continue;
            };
            let location = ParamLocation::parse(location);
            let required = param
                .get("required")
                .and_then(DocumentNode::as_bool)
                .unwrap_or(location == ParamLocation::Path);
            let schema = match param.get("schema") {
                Some(s) => Some(self.schema(s, ctx, 0)),
                None => self
                    .content(param, ctx)
                    .into_iter()
                    .find_map(|m| m.schema),
            };
            out.push(Parameter {
                name: name.to_string(),
                location,
                required,
                schema,
                span: item.span,
            });
        }
        out
    }

    fn responses(&mut self, node: &'a DocumentNode, ctx: &str) -> Vec<Response> {
        let Some(entries) = node.entries() else {
            self.anomaly(
                AnomalyKind::Other,
                ctx,
                format!("responses must be a mapping, found a {}", node.kind_name()),
                node.span,
            );
            return Vec::new();
        };
        let mut out = Vec::new();
        for (key, value) in entries {
            if key.name.starts_with("x-") {
                continue;
            }
            let rctx = format!("{ctx} {}", key.name);
            let Some(resp) = self.deref(value, &rctx) else {
                continue;
            };
            let mut content = self.content(resp, &rctx);
            if let Some(schema) = resp.get("schema") {
                let id = self.schema(schema, &rctx, 0);
                content.push(MediaType {
                    name: "*/*".into(),
                    schema: Some(id),
                    span: schema.span,
                });
            }
            out.push(Response {
                status: key.name.clone(),
                span: key.span,
                content,
            });
        }
        out
    }

    /// Media types under `content`, each with an optional schema.
    fn content(&mut self, node: &'a DocumentNode, ctx: &str) -> Vec<MediaType> {
        let Some(content) = node.get("content") else {
            return Vec::new();
        };
        let Some(entries) = content.entries() else {
            self.anomaly(
                AnomalyKind::Other,
                ctx,
                format!("content must be a mapping, found a {}", content.kind_name()),
                content.span,
            );
            return Vec::new();
        };
        let mut out = Vec::new();
        for (key, media) in entries {
            let schema = media.get("schema").map(|s| self.schema(s, ctx, 0));
            out.push(MediaType {
                name: key.name.clone(),
                schema,
                span: key.span,
            });
        }
        out
    }

    /// Follow a `$ref` chain on a non-schema object.
    fn deref(&mut self, node: &'a DocumentNode, ctx: &str) -> Option<&'a DocumentNode> {
        let mut cur = node;
        for _ in 0..MAX_REF_DEPTH {
            let Some(pointer) = cur.reference() else {
                return Some(cur);
            };
            cur = self.lookup(pointer, ctx, cur.span)?;
        }
        self.anomaly(
            AnomalyKind::Other,
            ctx,
            format!("reference chain exceeds {MAX_REF_DEPTH} hops"),
            node.span,
        );
        None
    }

    /// Resolve a document-local pointer, recording an anomaly when it
    /// cannot be resolved.
    fn lookup(&mut self, pointer: &str, ctx: &str, span: SourceSpan) -> Option<&'a DocumentNode> {
        if !pointer.starts_with('#') {
            self.anomaly(
                AnomalyKind::UnresolvedReference,
                ctx,
                format!("external reference \"{pointer}\" is not followed; only document-local references resolve"),
                span,
            );
            return None;
        }
        let root: &'a DocumentNode = self.root;
        match root.pointer(pointer) {
            Some(target) => Some(target),
            None => {
                self.anomaly(
                    AnomalyKind::UnresolvedReference,
                    ctx,
                    format!("reference \"{pointer}\" does not resolve to anything in this document"),
                    span,
                );
                None
            }
        }
    }

    fn schema(&mut self, node: &'a DocumentNode, ctx: &str, depth: usize) -> SchemaId {
        let id = self.doc.schemas.alloc(node.span);
        self.fill_schema(id, node, ctx, depth);
        id
    }

    fn schema_ref(&mut self, pointer: &str, ctx: &str, span: SourceSpan, depth: usize) -> Option<SchemaId> {
        if let Some(id) = self.by_pointer.get(pointer) {
            return Some(*id);
        }
        let target = self.lookup(pointer, ctx, span)?;
        let id = self.doc.schemas.alloc(target.span);
        self.by_pointer.insert(pointer.to_string(), id);
        self.fill_schema(id, target, ctx, depth + 1);
        Some(id)
    }

    fn fill_schema(&mut self, id: SchemaId, node: &'a DocumentNode, ctx: &str, depth: usize) {
        if depth > MAX_REF_DEPTH {
            self.anomaly(
                AnomalyKind::Other,
                ctx,
                format!("schema nesting exceeds {MAX_REF_DEPTH} levels; deeper structure ignored"),
                node.span,
            );
            return;
        }
        if node.as_bool().is_some() {
            // OpenAPI 3.1 boolean schemas.
            return;
        }
        if !node.is_mapping() {
            self.anomaly(
                AnomalyKind::Other,
                ctx,
                format!("schema must be a mapping, found a {}", node.kind_name()),
                node.span,
            );
            return;
        }

        if let Some(pointer) = node.reference() {
            let target = self.schema_ref(pointer, ctx, node.span, depth);
            self.doc.schemas.set_kind(
                id,
                SchemaKind::Ref {
                    pointer: pointer.to_string(),
                    target,
                },
            );
            return;
        }

        let mut members = Vec::new();
        for keyword in ["allOf", "anyOf", "oneOf"] {
            if let Some(list) = node.get(keyword) {
                match list.as_sequence() {
                    Some(items) => {
                        for item in items {
                            members.push(self.schema(item, ctx, depth + 1));
                        }
                    }
                    None => self.anomaly(
                        AnomalyKind::Other,
                        ctx,
                        format!("`{keyword}` must be a sequence of schemas"),
                        list.span,
                    ),
                }
            }
        }
        if let Some(not) = node.get("not") {
            members.push(self.schema(not, ctx, depth + 1));
        }

        let type_name = schema_type(node);
        let mut properties = Vec::new();
        if let Some(props) = node.get("properties") {
            match props.entries() {
                Some(entries) => {
                    for (key, value) in entries {
                        properties.push((key.name.clone(), self.schema(value, ctx, depth + 1)));
                    }
                }
                None => self.anomaly(
                    AnomalyKind::Other,
                    ctx,
                    "`properties` must be a mapping",
                    props.span,
                ),
            }
        }
        let additional = node
            .get("additionalProperties")
            .filter(|n| n.is_mapping())
            .map(|n| self.schema(n, ctx, depth + 1));
        let items = node
            .get("items")
            .map(|n| self.schema(n, ctx, depth + 1));

        let kind = if !members.is_empty() {
            members.extend(properties.into_iter().map(|(_, id)| id));
            members.extend(additional);
            members.extend(items);
            SchemaKind::Composite { members }
        } else if type_name.as_deref() == Some("object") || !properties.is_empty() || additional.is_some() {
            SchemaKind::Object {
                properties,
                additional,
            }
        } else if type_name.as_deref() == Some("array") || items.is_some() {
            SchemaKind::Array { items }
        } else {
            SchemaKind::Primitive { type_name }
        };
        self.doc.schemas.set_kind(id, kind);
    }
}

/// `type` as a single name; for 3.1 type arrays the first non-null entry.
fn schema_type(node: &DocumentNode) -> Option<String> {
    let t = node.get("type")?;
    if let Some(s) = t.as_str() {
        return Some(s.to_string());
    }
    t.as_sequence()?
        .iter()
        .filter_map(DocumentNode::as_str)
        .find(|s| *s != "null")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;

    fn norm(text: &str) -> OpenApiDocument {
        normalize(&load(text).unwrap())
    }

    #[test]
    fn test_missing_version_assumes_latest() {
        let doc = norm("paths: {}\n");
        assert_eq!(doc.version, DEFAULT_OPENAPI_VERSION);
        assert!(!doc.version_declared);
        assert_eq!(doc.anomalies.len(), 1);
        assert_eq!(doc.anomalies[0].kind, AnomalyKind::MissingVersion);
    }

    #[test]
    fn test_operations_responses_and_parameters() {
        let doc = norm(
            r##"
openapi: 3.0.3
paths:
  /items/{id}:
    parameters:
      - name: id
        in: path
        schema: { type: string }
    get:
      operationId: getItem
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Item"
        "404":
          description: missing
components:
  schemas:
    Item:
      type: object
      properties:
        id: { type: string }
"##,
        );
        assert!(doc.anomalies.is_empty(), "{:?}", doc.anomalies);
        let path = &doc.paths[0];
        assert_eq!(path.template, "/items/{id}");
        assert_eq!(path.parameters.len(), 1);
        assert!(path.parameters[0].required);
        let op = &path.operations[0];
        assert_eq!(op.method, HttpMethod::Get);
        assert_eq!(op.operation_id.as_ref().unwrap().value, "getItem");
        assert_eq!(op.responses.len(), 2);
        assert!(op.responses[0].has_schema());
        assert!(!op.responses[1].has_schema());

        let item = doc.component("Item").unwrap();
        let schema_id = op.responses[0].content[0].schema.unwrap();
        match &doc.schemas.get(schema_id).unwrap().kind {
            SchemaKind::Ref { target, .. } => assert_eq!(*target, Some(item.schema)),
            other => panic!("expected ref, got {other:?}"),
        }
        assert!(doc.used_components().contains("Item"));
    }

    #[test]
    fn test_unresolved_and_external_refs_are_anomalies() {
        let doc = norm(
            r##"
openapi: 3.0.0
paths:
  /a:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Nope" }
        "400":
          $ref: "common.yaml#/responses/BadRequest"
"##,
        );
        let unresolved: Vec<_> = doc
            .anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::UnresolvedReference)
            .collect();
        assert_eq!(unresolved.len(), 2);
        // The unresolved schema ref is kept as a ref with no target.
        let op = &doc.paths[0].operations[0];
        let id = op.responses[0].content[0].schema.unwrap();
        assert!(matches!(
            doc.schemas.get(id).unwrap().kind,
            SchemaKind::Ref { target: None, .. }
        ));
        // The external response could not be dereferenced and is dropped.
        assert_eq!(op.responses.len(), 1);
    }

    #[test]
    fn test_cyclic_component_refs_terminate() {
        let doc = norm(
            r##"
openapi: 3.1.0
paths: {}
components:
  schemas:
    Node:
      type: object
      properties:
        next: { $ref: "#/components/schemas/Node" }
        peer: { $ref: "#/components/schemas/Peer" }
    Peer:
      allOf:
        - $ref: "#/components/schemas/Node"
    Loop:
      $ref: "#/components/schemas/Loop"
"##,
        );
        assert!(doc.anomalies.is_empty(), "{:?}", doc.anomalies);
        let node = doc.component("Node").unwrap().schema;
        let reach = doc.schemas.reachable([node]);
        assert!(reach.contains(&doc.component("Peer").unwrap().schema));
        let lp = doc.component("Loop").unwrap().schema;
        assert_eq!(
            doc.schemas.get(lp).unwrap().kind,
            SchemaKind::Ref {
                pointer: "#/components/schemas/Loop".into(),
                target: Some(lp)
            }
        );
    }

    #[test]
    fn test_non_component_ref_chain_memoized() {
        let doc = norm(
            r##"
openapi: 3.0.0
paths:
  /a:
    get:
      responses:
        "200":
          $ref: "#/x-shared/ok"
x-shared:
  ok:
    description: ok
    content:
      application/json:
        schema:
          type: object
          properties:
            self: { $ref: "#/x-shared/ok/content/application~1json/schema" }
"##,
        );
        assert!(doc.anomalies.is_empty(), "{:?}", doc.anomalies);
        assert!(doc.paths[0].operations[0].responses[0].has_schema());
    }

    #[test]
    fn test_swagger2_definitions_and_body() {
        let doc = norm(
            r##"
swagger: "2.0"
paths:
  /pets:
    post:
      operationId: addPet
      parameters:
        - in: body
          name: pet
          schema: { $ref: "#/definitions/Pet" }
      responses:
        200:
          description: ok
          schema: { $ref: "#/definitions/Pet" }
definitions:
  Pet:
    type: object
"##,
        );
        assert!(doc.is_swagger2());
        assert!(doc.anomalies.is_empty(), "{:?}", doc.anomalies);
        let op = &doc.paths[0].operations[0];
        assert!(op.parameters.is_empty());
        assert_eq!(op.request_body.len(), 1);
        assert!(op.responses[0].has_schema());
        assert!(doc.used_components().contains("Pet"));
    }

    #[test]
    fn test_structural_anomalies_do_not_abort() {
        let doc = norm(
            r#"
openapi: 3.0.0
paths:
  items:
    get: 42
    frobnicate: {}
  /ok:
    post:
      operationId: create
"#,
        );
        let msgs: Vec<&str> = doc.anomalies.iter().map(|a| a.message.as_str()).collect();
        assert!(msgs.iter().any(|m| m.contains("must start with '/'")));
        assert!(msgs.iter().any(|m| m.contains("operation must be a mapping")));
        assert!(msgs.iter().any(|m| m.contains("frobnicate")));
        assert!(msgs.iter().any(|m| m.contains("no responses")));
        assert_eq!(doc.paths.len(), 2);
        assert_eq!(doc.paths[1].operations.len(), 1);
    }

    #[test]
    fn test_ref_chain_depth_is_capped() {
        let mut text = String::from("openapi: 3.0.0\npaths:\n  /a:\n    get:\n      responses:\n        \"200\":\n          $ref: \"#/x-r/r0\"\nx-r:\n");
        for i in 0..(MAX_REF_DEPTH + 5) {
            text.push_str(&format!("  r{i}:\n    $ref: \"#/x-r/r{}\"\n", i + 1));
        }
        text.push_str(&format!("  r{}:\n    description: end\n", MAX_REF_DEPTH + 5));
        let doc = norm(&text);
        assert!(doc
            .anomalies
            .iter()
            .any(|a| a.message.contains("reference chain exceeds")));
    }

    #[test]
    fn test_schema_nesting_depth_is_capped() {
        let hops = MAX_REF_DEPTH + 6;
        let mut text = String::from(
            "openapi: 3.0.0\npaths:\n  /a:\n    get:\n      responses:\n        \"200\":\n          description: ok\n          content:\n            application/json:\n              schema:\n                $ref: \"#/x-s/s0\"\nx-s:\n",
        );
        for i in 0..hops {
            text.push_str(&format!("  s{i}:\n    $ref: \"#/x-s/s{}\"\n", i + 1));
        }
        text.push_str(&format!("  s{hops}:\n    type: string\n"));
        let doc = norm(&text);
        let capped: Vec<_> = doc
            .anomalies
            .iter()
            .filter(|a| a.message.contains("schema nesting exceeds"))
            .collect();
        assert_eq!(capped.len(), 1, "{:?}", doc.anomalies);
        assert_eq!(capped[0].kind, AnomalyKind::Other);
        assert!(doc.paths[0].operations[0].responses[0].has_schema());
    }
}
