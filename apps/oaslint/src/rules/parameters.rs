//! `path-parameter-mismatch`: `{placeholders}` vs declared path parameters.

use super::{Rule, Violation};
use crate::error::RuleError;
use crate::models::openapi::{OpenApiDocument, ParamLocation, Parameter};
use crate::models::Severity;
use regex::Regex;
use std::collections::BTreeSet;

const PLACEHOLDER: &str = r"\{([^{}/]+)\}";

pub struct PathParameterMismatch;

impl Rule for PathParameterMismatch {
    fn id(&self) -> &'static str {
        "path-parameter-mismatch"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn description(&self) -> &'static str {
        "path template placeholder without a matching `in: path` parameter, or the reverse"
    }

    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
        let re = Regex::new(PLACEHOLDER).map_err(|e| RuleError(e.to_string()))?;
        let mut out = Vec::new();
        for path in &doc.paths {
            let placeholders: BTreeSet<&str> = re
                .captures_iter(&path.template)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
            for op in &path.operations {
                let label = path.label(op);
                // Operation-level parameters override path-level ones by name.
                let mut declared: Vec<&Parameter> = op
                    .parameters
                    .iter()
                    .filter(|p| p.location == ParamLocation::Path)
                    .collect();
                for p in path.parameters.iter().filter(|p| p.location == ParamLocation::Path) {
                    if !declared.iter().any(|d| d.name == p.name) {
                        declared.push(p);
                    }
                }
                for name in &placeholders {
                    if !declared.iter().any(|p| p.name == *name) {
                        out.push(Violation::new(
                            label.clone(),
                            format!("path parameter \"{name}\" in \"{}\" is not declared", path.template),
                            op.span,
                        ));
                    }
                }
                for p in declared {
                    if !placeholders.contains(p.name.as_str()) {
                        out.push(Violation::new(
                            label.clone(),
                            format!(
                                "path parameter \"{}\" is declared but \"{}\" has no {{{}}} placeholder",
                                p.name, path.template, p.name
                            ),
                            p.span,
                        ));
                    }
                }
            }
        }
        Ok(out)
    }
}
