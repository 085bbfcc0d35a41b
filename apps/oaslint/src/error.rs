//! Error types for loading, configuration, rules, and tool requests.

use crate::models::SourceSpan;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadErrorKind {
    Syntax,
    DuplicateKey,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErrorKind::Syntax => f.write_str("syntax error"),
            LoadErrorKind::DuplicateKey => f.write_str("duplicate key"),
        }
    }
}

/// The definition text could not be turned into a document tree.
/// Aborts the pipeline for that request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} at line {}, column {}: {message}", .span.line, .span.column)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub span: SourceSpan,
    pub message: String,
}

impl LoadError {
    pub fn syntax(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            kind: LoadErrorKind::Syntax,
            span,
            message: message.into(),
        }
    }

    pub fn duplicate_key(span: SourceSpan, key: &str) -> Self {
        Self {
            kind: LoadErrorKind::DuplicateKey,
            span,
            message: format!("mapping key \"{key}\" appears more than once"),
        }
    }
}

/// Failure raised inside a rule; the engine turns it into a finding.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RuleError(pub String);

/// Invalid tool arguments, detected before the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("required argument \"{field}\" not found")]
    MissingField { field: String },

    #[error("argument \"{field}\" is not a string")]
    WrongType { field: String },
}

/// Everything that turns a tool call into an error result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("OpenAPI definition could not be loaded: {0}")]
    Load(#[from] LoadError),
}

/// Failure collecting or reading files for `oaslint lint`.
#[derive(Debug, Error)]
pub enum FilesError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown rule id in config: {0}")]
    UnknownRule(String),

    #[error("invalid severity '{value}' for rule '{rule}' (expected error|warning|info)")]
    InvalidSeverity { rule: String, value: String },

    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
