//! `naming-granularity`: operation boundaries that are too fine-grained.

use super::{Rule, Violation};
use crate::error::RuleError;
use crate::models::openapi::OpenApiDocument;
use crate::models::Severity;

/// Names that describe a single primitive step rather than a capability.
const GENERIC_VERBS: &[&str] = &[
    "add", "subtract", "multiply", "divide", "get", "set", "put", "post", "patch", "update",
    "delete", "remove", "create", "fetch", "do", "run", "call", "execute",
];

const ADVICE: &str = "a function name or path should never be too granular, for example never named \"add\" or \"subtract\" but rather \"calculate\"";

pub struct NamingGranularity;

pub fn is_generic_verb(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    GENERIC_VERBS.contains(&lower.as_str())
}

impl Rule for NamingGranularity {
    fn id(&self) -> &'static str {
        "naming-granularity"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn description(&self) -> &'static str {
        "operationId or path segment is a bare generic verb such as \"add\" or \"get\""
    }

    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
        let mut out = Vec::new();
        for path in &doc.paths {
            for segment in path.template.split('/') {
                if segment.starts_with('{') || !is_generic_verb(segment) {
                    continue;
                }
                out.push(Violation::new(
                    path.template.clone(),
                    format!("path segment \"{segment}\" is too granular: {ADVICE}"),
                    path.span,
                ));
            }
            for op in &path.operations {
                let Some(id) = &op.operation_id else {
                    continue;
                };
                if is_generic_verb(&id.value) {
                    out.push(Violation::new(
                        path.label(op),
                        format!("operationId \"{}\" is too granular: {ADVICE}", id.value),
                        id.span,
                    ));
                }
            }
        }
        Ok(out)
    }
}
