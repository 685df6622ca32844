//! Logging for the KubeStellar MCP server.
//!
//! Stdout carries the JSON-RPC stream, so every log line goes to stderr.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, TracingConfig};
