//! Finding aggregator: dedup, deterministic ordering, per-severity counts.

use crate::models::{Finding, LintReport, Severity, Summary};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Build the final report from raw findings.
///
/// Order is severity descending, then span (line, column), then rule id.
/// Fingerprint breaks any remaining tie, so the order is total and running
/// `aggregate` on its own output yields the same report.
pub fn aggregate(findings: Vec<Finding>) -> LintReport {
    let mut findings = findings;
    findings.sort_by(compare);
    let mut seen: HashSet<String> = HashSet::new();
    findings.retain(|f| seen.insert(f.fingerprint.clone()));

    let mut summary = Summary::default();
    for f in &findings {
        match f.severity {
            Severity::Error => summary.errors += 1,
            Severity::Warning => summary.warnings += 1,
            Severity::Info => summary.infos += 1,
        }
    }
    LintReport { findings, summary }
}

fn compare(a: &Finding, b: &Finding) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| (a.span.line, a.span.column).cmp(&(b.span.line, b.span.column)))
        .then_with(|| a.rule.cmp(&b.rule))
        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceSpan;

    fn f(rule: &str, sev: Severity, line: u32, col: u32, msg: &str) -> Finding {
        Finding::new(rule, sev, "loc", msg, SourceSpan::new(line, col, 0, 0))
    }

    #[test]
    fn test_sorts_by_severity_then_span_then_rule() {
        let report = aggregate(vec![
            f("b", Severity::Info, 1, 1, "i"),
            f("z", Severity::Error, 9, 1, "e2"),
            f("a", Severity::Warning, 2, 1, "w"),
            f("y", Severity::Error, 3, 5, "e1"),
            f("x", Severity::Error, 3, 5, "e0"),
        ]);
        let rules: Vec<&str> = report.findings.iter().map(|f| f.rule.as_str()).collect();
        assert_eq!(rules, vec!["x", "y", "z", "a", "b"]);
        assert_eq!(
            report.summary,
            Summary {
                errors: 3,
                warnings: 1,
                infos: 1
            }
        );
    }

    #[test]
    fn test_dedups_by_fingerprint() {
        let report = aggregate(vec![
            f("r", Severity::Error, 4, 1, "same"),
            f("r", Severity::Error, 2, 1, "same"),
            f("r", Severity::Error, 4, 1, "other"),
        ]);
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].span.line, 2);
        assert_eq!(report.summary.errors, 2);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let once = aggregate(vec![
            f("b", Severity::Warning, 7, 2, "m"),
            f("a", Severity::Warning, 7, 2, "m"),
            f("a", Severity::Warning, 7, 2, "m"),
            f("c", Severity::Info, 1, 1, "n"),
        ]);
        let twice = aggregate(once.findings.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input_gives_zero_counts() {
        let report = aggregate(Vec::new());
        assert!(report.findings.is_empty());
        assert_eq!(report.summary.total(), 0);
        assert!(!report.has_errors());
    }
}
