//! MCP Server for KubeStellar
//!
//! This crate provides a Model Context Protocol (MCP) server that exposes
//! KubeStellar and Kubernetes operations to AI agents:
//!
//! - **Tools**: create and inspect BindingPolicies, manage namespaces and pods,
//!   inspect clusters, edit Workload Description Space contexts
//! - **Resources**: read-only views of binding policies and kubeconfig contexts
//!
//! # Architecture
//!
//! The server speaks JSON-RPC 2.0 over stdio. Every tool call may name a
//! kubeconfig context; the server resolves a client for it through a
//! [`ClientProvider`](kube_api_interface::ClientProvider) and runs the tool
//! against that client. Tool failures come back as structured error payloads
//! inside the tool result.

pub mod error;
pub mod resources;
pub mod server;
pub mod tools;

pub use error::{ErrorPayload, ToolError, ToolResult};
pub use server::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, KubestellarMcpServer};
pub use server::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
