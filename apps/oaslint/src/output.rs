//! Output rendering for lint reports.
//!
//! Supports `human` (default) and `json` outputs for the CLI, plus the
//! plain text form returned to tool clients. The JSON form includes
//! per-file findings and a top-level summary.

use crate::lint::FileReport;
use crate::models::{Finding, LintReport, Severity, Summary};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::fmt::Write as _;

/// Text returned for a report without findings.
pub const NO_ERRORS: &str = "No errors";

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Plain text form: a header line with counts, then one
/// `SEVERITY [location]: message` line per finding.
pub fn render_text(report: &LintReport) -> String {
    if report.findings.is_empty() {
        return NO_ERRORS.to_string();
    }
    let s = &report.summary;
    let mut out = format!(
        "Found {} issue(s): {} error(s), {} warning(s), {} info(s)",
        s.total(),
        s.errors,
        s.warnings,
        s.infos
    );
    for f in &report.findings {
        let _ = write!(out, "\n{} [{}]: {}", f.severity, f.location, f.message);
    }
    out
}

fn severity_tag(sev: Severity, color: bool) -> String {
    let (tag, icon) = match sev {
        Severity::Error => ("⟦error⟧", "✖"),
        Severity::Warning => ("⟦warn⟧", "▲"),
        Severity::Info => ("⟦info⟧", "◆"),
    };
    if !color {
        return format!("{icon} {tag}");
    }
    match sev {
        Severity::Error => format!("{} {}", icon.red(), tag.red().bold()),
        Severity::Warning => format!("{} {}", icon.yellow(), tag.yellow().bold()),
        Severity::Info => format!("{} {}", icon.blue(), tag.blue().bold()),
    }
}

fn human_finding(file: &str, f: &Finding, color: bool) -> String {
    let at = format!("{file}:{}", f.span);
    let at = if color { at.bold().to_string() } else { at };
    format!(
        "{} {} ❲{}❳ [{}] — {}",
        severity_tag(f.severity, color),
        at,
        f.rule,
        f.location,
        f.message
    )
}

/// Totals across files. A file that failed to load counts as one error.
pub fn total_summary(files: &[FileReport]) -> Summary {
    let mut total = Summary::default();
    for fr in files {
        match &fr.outcome {
            Ok(report) => {
                total.errors += report.summary.errors;
                total.warnings += report.summary.warnings;
                total.infos += report.summary.infos;
            }
            Err(_) => total.errors += 1,
        }
    }
    total
}

/// Print per-file lint results in the requested format.
pub fn print_lint(files: &[FileReport], output: &str) -> serde_json::Result<()> {
    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&compose_lint_json(files)?)?);
        return Ok(());
    }
    let color = use_colors(output);
    for fr in files {
        match &fr.outcome {
            Ok(report) => {
                for f in &report.findings {
                    println!("{}", human_finding(&fr.file, f, color));
                }
            }
            Err(e) => {
                let at = format!("{}:{}", fr.file, e.span);
                let at = if color { at.bold().to_string() } else { at };
                println!("{} {} ❲load❳ — {}", severity_tag(Severity::Error, color), at, e);
            }
        }
    }
    let s = total_summary(files);
    let summary = format!(
        "— Summary — errors={} warnings={} infos={} files={}",
        s.errors,
        s.warnings,
        s.infos,
        files.len()
    );
    if color {
        println!("{}", summary.bold());
    } else {
        println!("{}", summary);
    }
    Ok(())
}

/// Compose lint JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(files: &[FileReport]) -> serde_json::Result<JsonVal> {
    let mut results = Vec::with_capacity(files.len());
    for fr in files {
        let item = match &fr.outcome {
            Ok(report) => json!({
                "file": fr.file,
                "findings": serde_json::to_value(&report.findings)?,
                "summary": serde_json::to_value(report.summary)?,
            }),
            Err(e) => json!({
                "file": fr.file,
                "error": serde_json::to_value(e)?,
            }),
        };
        results.push(item);
    }
    let s = total_summary(files);
    Ok(json!({
        "results": results,
        "summary": {
            "errors": s.errors,
            "warnings": s.warnings,
            "infos": s.infos,
            "files": files.len(),
        }
    }))
}
