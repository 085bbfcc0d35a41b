//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "oaslint",
    version,
    about = "OpenAPI definition linter and MCP tool server",
    long_about = "oaslint — lint OpenAPI (YAML/JSON) definitions locally or serve the `checkForErrors` MCP tool.\n\nConfiguration precedence: CLI > oaslint.toml > defaults.",
    after_help = "Examples:\n  oaslint serve\n  oaslint serve --transport http --bind 127.0.0.1:8081\n  oaslint lint 'specs/**/*.yaml' --output json\n  oaslint rules",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current oaslint version.")]
    Version,
    /// Run the MCP server
    #[command(
        about = "Serve the checkForErrors tool",
        long_about = "Run an MCP server exposing `checkForErrors` over stdio (default) or streamable HTTP at /mcp.",
        after_help = "Examples:\n  oaslint serve\n  oaslint serve --transport http --bind 0.0.0.0:8081"
    )]
    Serve {
        #[arg(long, help = "Project root used for config discovery (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Transport: stdio|http (default: stdio)")]
        transport: Option<String>,
        #[arg(long, help = "Bind address for http (default: 0.0.0.0:8081)")]
        bind: Option<String>,
    },
    /// Lint local definition files
    #[command(
        about = "Lint definition files",
        long_about = "Lint OpenAPI files matched by glob patterns, relative to the project root. Any error finding exits with status 1.",
        after_help = "Examples:\n  oaslint lint openapi.yaml\n  oaslint lint 'specs/*.json' --output json"
    )]
    Lint {
        #[arg(required = true, help = "Glob patterns of files to lint")]
        patterns: Vec<String>,
        #[arg(long, help = "Project root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// List registered rules
    #[command(
        about = "List rules",
        long_about = "List the rules in effect after config is applied, with their severities."
    )]
    Rules {
        #[arg(long, help = "Project root (default: current dir)")]
        root: Option<String>,
    },
}
