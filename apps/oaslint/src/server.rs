//! MCP server exposing `checkForErrors`.
//!
//! Transports:
//! - `stdio`: newline-delimited JSON-RPC on stdin/stdout.
//! - `http`: streamable HTTP mounted at `/mcp` on the bind address.
//!
//! The server only holds the immutable rule set; every call runs the
//! pipeline from scratch.

use crate::rules::RuleSet;
use crate::tool::{self as adapter, CheckForErrorsArgs};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig,
            StreamableHttpService,
        },
    },
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use std::sync::Arc;
use tracing::info;

pub const SERVER_NAME: &str = "OpenAPI Error Checker";
pub const SERVER_VERSION: &str = "1.0.0";
pub const HTTP_PATH: &str = "/mcp";

#[derive(Clone)]
pub struct OpenApiCheckerServer {
    tool_router: ToolRouter<OpenApiCheckerServer>,
    rules: Arc<RuleSet>,
}

impl OpenApiCheckerServer {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            tool_router: Self::tool_router(),
            rules: Arc::new(rules),
        }
    }
}

#[tool_router]
impl OpenApiCheckerServer {
    #[tool(
        name = "checkForErrors",
        description = "Checks an OpenAPI YAML definitions for errors"
    )]
    async fn check_for_errors(
        &self,
        Parameters(args): Parameters<CheckForErrorsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let keys: &[&str] = if args.open_api_yaml.is_some() {
            &[adapter::ARG_NAME]
        } else {
            &[]
        };
        info!(tool = adapter::TOOL_NAME, ?keys, "tool call");
        let rules = Arc::clone(&self.rules);
        let outcome = tokio::task::spawn_blocking(move || adapter::handle(&args, &rules))
            .await
            .map_err(|e| McpError::internal_error(format!("lint task failed: {e}"), None))?;
        Ok(adapter::into_call_result(outcome))
    }
}

#[tool_handler]
impl ServerHandler for OpenApiCheckerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Lints OpenAPI (YAML or JSON) definitions. Call checkForErrors with the definition text in openAPIYAML.".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Serve over stdin/stdout until the client disconnects.
pub async fn serve_stdio(rules: RuleSet) -> anyhow::Result<()> {
    info!(server = SERVER_NAME, "serving on stdio");
    let service = OpenApiCheckerServer::new(rules).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Serve streamable HTTP at `bind` until Ctrl-C.
pub async fn serve_http(rules: RuleSet, bind: &str) -> anyhow::Result<()> {
    let server = OpenApiCheckerServer::new(rules);
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let app = axum::Router::new().nest_service(HTTP_PATH, service);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(server = SERVER_NAME, addr = %listener.local_addr()?, path = HTTP_PATH, "serving streamable HTTP");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call_args(value: serde_json::Value) -> Parameters<CheckForErrorsArgs> {
        Parameters(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_server_info_identity() {
        let info = OpenApiCheckerServer::new(RuleSet::builtin()).get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert_eq!(info.server_info.version, SERVER_VERSION);
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_tool_is_registered() {
        let server = OpenApiCheckerServer::new(RuleSet::builtin());
        let tools = server.tool_router.list_all();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, adapter::TOOL_NAME);
        let schema = serde_json::to_value(tools[0].input_schema.as_ref()).unwrap();
        assert!(schema["properties"].get(adapter::ARG_NAME).is_some());
    }

    #[tokio::test]
    async fn test_check_for_errors_reports_findings() {
        let server = OpenApiCheckerServer::new(RuleSet::builtin());
        let text = r#"{"openapi":"3.0.0","paths":{"/items/add":{"get":{"operationId":"add","responses":{"200":{}}}}}}"#;
        let result = server
            .check_for_errors(call_args(json!({ "openAPIYAML": text })))
            .await
            .unwrap();
        let v = serde_json::to_value(&result).unwrap();
        assert_ne!(v["isError"], json!(true));
        let body = v["content"][0]["text"].as_str().unwrap();
        assert!(body.contains("ERROR [GET /items/add]"));
        assert!(body.contains("WARNING [GET /items/add]"));
        assert!(v["structuredContent"]["summary"]["errors"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_missing_argument_is_error_result() {
        let server = OpenApiCheckerServer::new(RuleSet::builtin());
        let result = server.check_for_errors(call_args(json!({}))).await.unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}
