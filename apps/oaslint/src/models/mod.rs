//! Shared data models: source positions, findings, and the lint report.
//!
//! Submodules hold the two intermediate trees of the pipeline:
//! - `document`: the generic span-carrying tree produced by the loader.
//! - `openapi`: the normalized OpenAPI view produced by the normalizer.

pub mod document;
pub mod openapi;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
/// Position of a node in the original text.
///
/// `line` and `column` are 1-based; `start..end` is a byte range into the
/// source. Ordering compares line, then column.
pub struct SourceSpan {
    pub line: u32,
    pub column: u32,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(line: u32, column: u32, start: usize, end: usize) -> Self {
        Self {
            line,
            column,
            start,
            end: end.max(start),
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Finding severity. Declaration order gives `Info < Warning < Error`.
pub enum Severity {
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Parse `error|warning|warn|info`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single issue reported by one rule at one document location.
pub struct Finding {
    pub rule: String,
    pub severity: Severity,
    /// Path template or document location, e.g. `GET /items` or
    /// `#/components/schemas/Pet`.
    pub location: String,
    pub message: String,
    pub span: SourceSpan,
    /// Additional locations for multi-site findings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<SourceSpan>,
    pub fingerprint: String,
}

impl Finding {
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        let rule = rule.into();
        let location = location.into();
        let message = message.into();
        let fingerprint = fingerprint(&rule, &location, &message);
        Self {
            rule,
            severity,
            location,
            message,
            span,
            related: Vec::new(),
            fingerprint,
        }
    }

    pub fn with_related(mut self, related: Vec<SourceSpan>) -> Self {
        self.related = related;
        self
    }
}

/// Stable identity of a finding: `sha256(rule \0 location \0 message)`,
/// truncated to 16 hex chars. Spans are deliberately excluded.
pub fn fingerprint(rule: &str, location: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule.as_bytes());
    hasher.update([0u8]);
    hasher.update(location.as_bytes());
    hasher.update([0u8]);
    hasher.update(message.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Per-severity counts.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Ordered, deduplicated findings plus counts. Built only by `aggregate`.
pub struct LintReport {
    pub findings: Vec<Finding>,
    pub summary: Summary,
}

impl LintReport {
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}
