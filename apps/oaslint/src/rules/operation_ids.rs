//! operationId uniqueness and presence.

use super::{Rule, Violation};
use crate::error::RuleError;
use crate::models::openapi::OpenApiDocument;
use crate::models::{Severity, SourceSpan};
use std::collections::BTreeMap;

pub struct DuplicateOperationId;

impl Rule for DuplicateOperationId {
    fn id(&self) -> &'static str {
        "duplicate-operation-id"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn description(&self) -> &'static str {
        "operationId used by more than one operation"
    }

    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
        let mut seen: BTreeMap<&str, Vec<(String, SourceSpan)>> = BTreeMap::new();
        for (path, op) in doc.operations() {
            if let Some(id) = &op.operation_id {
                seen.entry(id.value.as_str())
                    .or_default()
                    .push((path.label(op), id.span));
            }
        }
        let out = seen
            .into_iter()
            .filter(|(_, sites)| sites.len() > 1)
            .map(|(id, sites)| {
                let labels: Vec<&str> = sites.iter().map(|(l, _)| l.as_str()).collect();
                let message = format!(
                    "operationId \"{id}\" is used by {} operations: {}",
                    sites.len(),
                    labels.join(", ")
                );
                let spans: Vec<SourceSpan> = sites.iter().map(|(_, s)| *s).collect();
                Violation::new(format!("operationId {id}"), message, spans[0])
                    .with_related(spans)
            })
            .collect();
        Ok(out)
    }
}

pub struct MissingOperationId;

impl Rule for MissingOperationId {
    fn id(&self) -> &'static str {
        "missing-operation-id"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "operation without an operationId"
    }

    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
        Ok(doc
            .operations()
            .filter(|(_, op)| op.operation_id.is_none())
            .map(|(path, op)| {
                Violation::new(path.label(op), "operation has no operationId", op.span)
            })
            .collect())
    }
}
