//! `checkForErrors` tool adapter.
//!
//! Pure translation between a tool request payload and the lint pipeline.
//! Nothing here holds state across calls; the MCP transport lives in
//! `server`.

use crate::error::{RequestError, ToolError};
use crate::lint::lint_text;
use crate::models::LintReport;
use crate::output::render_text;
use crate::rules::RuleSet;
use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "checkForErrors";
pub const TOOL_DESCRIPTION: &str = "Checks an OpenAPI YAML definitions for errors";
pub const ARG_NAME: &str = "openAPIYAML";

#[derive(Debug, Default, Clone, Serialize, Deserialize, schemars::JsonSchema)]
/// Arguments of `checkForErrors`.
///
/// The field is kept as a raw JSON value so that a missing or mistyped
/// argument reaches `handle` and becomes an error result instead of a
/// protocol fault.
pub struct CheckForErrorsArgs {
    /// The OpenAPI definition as a YAML string
    #[serde(rename = "openAPIYAML")]
    #[schemars(with = "String")]
    pub open_api_yaml: Option<Value>,
}

impl CheckForErrorsArgs {
    /// Read the arguments from a raw request payload.
    pub fn from_object(args: Option<&JsonObject>) -> Self {
        Self {
            open_api_yaml: args.and_then(|a| a.get(ARG_NAME)).cloned(),
        }
    }

    /// The definition text, or why it is unusable.
    pub fn definition(&self) -> Result<&str, RequestError> {
        match &self.open_api_yaml {
            None | Some(Value::Null) => Err(RequestError::MissingField {
                field: ARG_NAME.to_string(),
            }),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(RequestError::WrongType {
                field: ARG_NAME.to_string(),
            }),
        }
    }
}

/// Validate the request and run the pipeline.
pub fn handle(args: &CheckForErrorsArgs, rules: &RuleSet) -> Result<LintReport, ToolError> {
    let text = args.definition()?;
    debug!(bytes = text.len(), "checking definition");
    lint_text(text, rules).map_err(ToolError::from)
}

/// Shape a pipeline outcome as a tool result: rendered text for clients
/// that only read `content`, plus the same data as structured content.
pub fn into_call_result(outcome: Result<LintReport, ToolError>) -> CallToolResult {
    match outcome {
        Ok(report) => CallToolResult {
            content: vec![Content::text(render_text(&report))],
            structured_content: structured(&report),
            is_error: Some(false),
            meta: None,
        },
        Err(err) => CallToolResult {
            content: vec![Content::text(err.to_string())],
            structured_content: Some(error_json(&err)),
            is_error: Some(true),
            meta: None,
        },
    }
}

/// Report as structured content; the text content still carries it when
/// serialization fails.
fn structured(report: &LintReport) -> Option<Value> {
    match serde_json::to_value(report) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "report serialization failed");
            None
        }
    }
}

fn error_json(err: &ToolError) -> Value {
    match err {
        ToolError::Request(e) => json!({
            "error": { "kind": "request", "message": e.to_string() }
        }),
        ToolError::Load(e) => json!({
            "error": {
                "kind": "load",
                "loadKind": e.kind,
                "message": e.message,
                "span": e.span,
            }
        }),
    }
}
