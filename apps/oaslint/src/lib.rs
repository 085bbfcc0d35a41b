//! oaslint core library.
//!
//! This crate lints OpenAPI definitions and exposes the linter as the
//! `checkForErrors` MCP tool.
//!
//! Pipeline: text -> `loader` -> `normalize` -> `lint` (rules) -> `aggregate`.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `loader`: YAML/JSON text to a span-carrying document tree.
//! - `normalize`: Document tree to the OpenAPI model, with `$ref` resolution.
//! - `rules`: Rule trait, registry, and built-in rules.
//! - `lint`: Rule engine and the end-to-end pipeline.
//! - `aggregate`: Dedup, ordering, and counts for the final report.
//! - `models`: Spans, findings, reports, document and OpenAPI models.
//! - `output`: Human/JSON/text printers for lint reports.
//! - `tool`: The `checkForErrors` request adapter.
//! - `server`: MCP server over stdio or streamable HTTP.
//! - `error`: Error types.
//! - `utils`: Supporting helpers.
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod lint;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod output;
pub mod rules;
pub mod server;
pub mod tool;
pub mod utils;
