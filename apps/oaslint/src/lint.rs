//! Rule engine and the end-to-end lint pipeline.
//!
//! `run` fans registered rules out over rayon against one read-only
//! document. Structural anomalies recorded by the normalizer are folded in
//! as findings. A rule that returns an error or panics yields a single
//! `rule-failure` finding; the remaining rules are unaffected.
//!
//! `lint_files` drives the same pipeline over local files for the CLI.

use crate::aggregate::aggregate;
use crate::error::{FilesError, LoadError};
use crate::loader::load;
use crate::models::openapi::{AnomalyKind, OpenApiDocument, StructuralAnomaly};
use crate::models::{Finding, LintReport, Severity, SourceSpan};
use crate::normalize::normalize;
use crate::rules::{
    RegisteredRule, RuleSet, MISSING_VERSION, RULE_FAILURE, STRUCTURAL_ANOMALY,
    UNRESOLVED_REFERENCE,
};
use glob::glob;
use rayon::prelude::*;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of linting one file.
pub struct FileReport {
    /// Path relative to the lint root when possible.
    pub file: String,
    pub outcome: Result<LintReport, LoadError>,
}

/// Load, normalize, check and aggregate one definition.
///
/// Only a `LoadError` aborts; everything after loading is folded into
/// the report.
pub fn lint_text(text: &str, rules: &RuleSet) -> Result<LintReport, LoadError> {
    let root = load(text)?;
    let doc = normalize(&root);
    let findings = run(&doc, rules);
    let report = aggregate(findings);
    debug!(
        errors = report.summary.errors,
        warnings = report.summary.warnings,
        infos = report.summary.infos,
        "lint complete"
    );
    Ok(report)
}

/// Lint every file matched by `patterns` (relative to `root`).
///
/// Files are processed in parallel; results are sorted by file path. A
/// pattern matching nothing is not an error.
pub fn lint_files(
    root: &Path,
    patterns: &[String],
    rules: &RuleSet,
) -> Result<Vec<FileReport>, FilesError> {
    let mut targets: Vec<PathBuf> = Vec::new();
    for pat in patterns {
        let abs = if Path::new(pat).is_absolute() {
            PathBuf::from(pat)
        } else {
            root.join(pat)
        };
        let pattern = abs.to_string_lossy().to_string();
        let entries = glob(&pattern).map_err(|e| FilesError::Pattern {
            pattern: pat.clone(),
            message: e.to_string(),
        })?;
        targets.extend(entries.flatten().filter(|p| p.is_file()));
    }
    targets.sort();
    targets.dedup();
    debug!(files = targets.len(), "linting files");

    let mut reports = targets
        .par_iter()
        .map(|path| {
            let text = fs::read_to_string(path).map_err(|source| FilesError::Read {
                path: path.clone(),
                source,
            })?;
            let file = pathdiff::diff_paths(path, root)
                .unwrap_or_else(|| path.clone())
                .to_string_lossy()
                .to_string();
            Ok(FileReport {
                file,
                outcome: lint_text(&text, rules),
            })
        })
        .collect::<Result<Vec<_>, FilesError>>()?;
    reports.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(reports)
}

/// Raw findings from anomalies and every registered rule, unsorted.
pub fn run(doc: &OpenApiDocument, rules: &RuleSet) -> Vec<Finding> {
    let mut findings: Vec<Finding> = doc.anomalies.iter().map(anomaly_finding).collect();
    let per_rule: Vec<Vec<Finding>> = rules
        .rules()
        .par_iter()
        .map(|r| run_rule(r, doc))
        .collect();
    findings.extend(per_rule.into_iter().flatten());
    findings
}

fn run_rule(registered: &RegisteredRule, doc: &OpenApiDocument) -> Vec<Finding> {
    let id = registered.id();
    let outcome = catch_unwind(AssertUnwindSafe(|| registered.rule.check(doc)));
    let reason = match outcome {
        Ok(Ok(violations)) => {
            return violations
                .into_iter()
                .map(|v| {
                    Finding::new(id, registered.severity, v.location, v.message, v.span)
                        .with_related(v.related)
                })
                .collect();
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    warn!(rule = id, %reason, "rule failed");
    vec![Finding::new(
        RULE_FAILURE,
        Severity::Error,
        format!("rule {id}"),
        format!("rule \"{id}\" failed: {reason}"),
        SourceSpan::default(),
    )]
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

fn anomaly_finding(a: &StructuralAnomaly) -> Finding {
    let (rule, severity) = match a.kind {
        AnomalyKind::UnresolvedReference => (UNRESOLVED_REFERENCE, Severity::Error),
        AnomalyKind::MissingVersion => (MISSING_VERSION, Severity::Warning),
        AnomalyKind::Other => (STRUCTURAL_ANOMALY, Severity::Warning),
    };
    Finding::new(rule, severity, a.location.clone(), a.message.clone(), a.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadErrorKind, RuleError};
    use crate::rules::{Rule, Violation};

    const CLEAN: &str = r##"
openapi: 3.0.3
paths:
  /inventory/{sku}:
    parameters:
      - { name: sku, in: path, required: true, schema: { type: string } }
    get:
      operationId: lookupInventory
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Stock" }
        "204":
          description: none
components:
  schemas:
    Stock:
      type: object
      properties:
        count: { type: integer }
"##;

    struct Boom;

    impl Rule for Boom {
        fn id(&self) -> &'static str {
            "boom"
        }
        fn default_severity(&self) -> Severity {
            Severity::Info
        }
        fn description(&self) -> &'static str {
            "always panics"
        }
        fn check(&self, _doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
            panic!("kaboom")
        }
    }

    struct Fails;

    impl Rule for Fails {
        fn id(&self) -> &'static str {
            "fails"
        }
        fn default_severity(&self) -> Severity {
            Severity::Info
        }
        fn description(&self) -> &'static str {
            "always errors"
        }
        fn check(&self, _doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError> {
            Err(RuleError("no luck".into()))
        }
    }

    #[test]
    fn test_granular_json_document() {
        let text = r#"{"openapi":"3.0.0","paths":{"/items/add":{"get":{"operationId":"add","responses":{"200":{}}}}}}"#;
        let report = lint_text(text, &RuleSet::builtin()).unwrap();
        let rules: Vec<&str> = report.findings.iter().map(|f| f.rule.as_str()).collect();
        assert!(rules.contains(&"naming-granularity"));
        assert!(rules.contains(&"missing-response-schema"));
        assert!(report.summary.errors >= 1);
        assert!(report.summary.warnings >= 1);
        assert!(report
            .findings
            .iter()
            .any(|f| f.rule == "naming-granularity" && f.message.contains("\"add\"")));
    }

    #[test]
    fn test_empty_input_is_load_error() {
        let err = lint_text("", &RuleSet::builtin()).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Syntax);
    }

    #[test]
    fn test_duplicate_keys_produce_no_report() {
        let err = lint_text("openapi: 3.0.0\nopenapi: 3.0.1\n", &RuleSet::builtin()).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::DuplicateKey);
    }

    #[test]
    fn test_duplicate_operation_id_reported_once() {
        let text = r#"
openapi: 3.0.0
paths:
  /items:
    get:
      operationId: listItems
      responses: {}
  /items/archived:
    get:
      operationId: listItems
      responses: {}
"#;
        let report = lint_text(text, &RuleSet::builtin()).unwrap();
        let dups: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.rule == "duplicate-operation-id")
            .collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].severity, Severity::Error);
        assert_eq!(dups[0].related.len(), 2);
    }

    #[test]
    fn test_clean_document_has_no_findings() {
        let report = lint_text(CLEAN, &RuleSet::builtin()).unwrap();
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_removing_a_rule_only_removes_its_findings() {
        let text = r#"
openapi: 3.0.0
paths:
  /items/get:
    get:
      operationId: get
      responses:
        "200": { description: ok }
    post:
      responses: {}
components:
  schemas:
    Unused: { type: string }
"#;
        let full = lint_text(text, &RuleSet::builtin()).unwrap();
        for registered in RuleSet::builtin().rules() {
            let id = registered.id();
            let reduced = lint_text(text, &RuleSet::builtin().without(id)).unwrap();
            let expected: Vec<_> = full.findings.iter().filter(|f| f.rule != id).collect();
            let actual: Vec<_> = reduced.findings.iter().collect();
            assert_eq!(expected, actual, "removing {id}");
        }
    }

    #[test]
    fn test_panicking_and_failing_rules_become_findings() {
        let mut rules = RuleSet::builtin();
        rules.register(Box::new(Boom));
        rules.register(Box::new(Fails));
        let report = lint_text(CLEAN, &rules).unwrap();
        let failures: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.rule == RULE_FAILURE)
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().any(|f| f.message.contains("kaboom")));
        assert!(failures.iter().any(|f| f.message.contains("no luck")));
        assert_eq!(report.summary.errors, 2);
    }

    #[test]
    fn test_lint_files_relative_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("specs")).unwrap();
        fs::write(root.join("specs/b.yaml"), CLEAN).unwrap();
        fs::write(root.join("specs/a.json"), "").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();

        let patterns = vec!["specs/*.yaml".to_string(), "specs/*.json".to_string()];
        let reports = lint_files(root, &patterns, &RuleSet::builtin()).unwrap();
        let files: Vec<&str> = reports.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["specs/a.json", "specs/b.yaml"]);
        assert!(reports[0].outcome.is_err());
        assert!(reports[1].outcome.as_ref().unwrap().findings.is_empty());

        let bad = vec!["specs/[".to_string()];
        assert!(matches!(
            lint_files(root, &bad, &RuleSet::builtin()),
            Err(FilesError::Pattern { .. })
        ));
    }

    #[test]
    fn test_anomalies_are_folded_in() {
        let text = r##"
paths:
  /a:
    get:
      operationId: readA
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Missing" }
"##;
        let report = lint_text(text, &RuleSet::builtin()).unwrap();
        let find = |rule: &str| report.findings.iter().find(|f| f.rule == rule);
        assert_eq!(find(UNRESOLVED_REFERENCE).map(|f| f.severity), Some(Severity::Error));
        assert_eq!(find(MISSING_VERSION).map(|f| f.severity), Some(Severity::Warning));
    }
}
