//! MCP Server implementation for KubeStellar.
//!
//! This module provides the main MCP server that exposes binding policy,
//! cluster, namespace, pod and WDS context operations to AI agents via the
//! Model Context Protocol.

use std::future::Future;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn, Instrument};

use kube_api_interface::{ClientProvider, ContextStore, KubeApi};
use observability::tool_span;
use policy_builder::StaticCatalog;

use crate::error::{ToolError, ToolResult};
use crate::resources::{self, ResourcePath};
use crate::tools::*;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name and version reported during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub title: String,
}

/// MCP Server for KubeStellar.
///
/// Kubernetes access goes through a [`ClientProvider`], which hands out one
/// client per requested kubeconfig context. Context editing goes through a
/// [`ContextStore`]. The catalog classifies resource types when policies are
/// built.
pub struct KubestellarMcpServer<P, X>
where
    P: ClientProvider + 'static,
    X: ContextStore + 'static,
{
    provider: Arc<P>,
    contexts: Arc<X>,
    catalog: Arc<StaticCatalog>,
}

impl<P, X> Clone for KubestellarMcpServer<P, X>
where
    P: ClientProvider + 'static,
    X: ContextStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            contexts: Arc::clone(&self.contexts),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<P, X> KubestellarMcpServer<P, X>
where
    P: ClientProvider + 'static,
    X: ContextStore + 'static,
{
    pub fn new(provider: P, contexts: X, catalog: StaticCatalog) -> Self {
        Self {
            provider: Arc::new(provider),
            contexts: Arc::new(contexts),
            catalog: Arc::new(catalog),
        }
    }

    pub fn server_info() -> ServerInfo {
        ServerInfo {
            name: "kubestellar-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: "KubeStellar MCP Server".to_string(),
        }
    }

    /// Resolve the client for the input's context, then run `handler`.
    async fn with_client<I, O, F, Fut>(&self, input: ToolResult<I>, handler: F) -> ToolResult<Value>
    where
        I: ContextArg,
        O: Serialize,
        F: FnOnce(Arc<dyn KubeApi>, I) -> Fut,
        Fut: Future<Output = ToolResult<O>>,
    {
        let input = input?;
        let api = self.provider.client(input.context()).await?;
        let output = handler(api, input).await?;
        encode(&output)
    }

    /// Dispatch one tool call; `None` means the tool does not exist.
    async fn call_tool(&self, name: &str, args: Value) -> Option<ToolResult<Value>> {
        let contexts: &dyn ContextStore = self.contexts.as_ref();
        let catalog: &StaticCatalog = self.catalog.as_ref();

        let result = match name {
            // BindingPolicy tools
            "create_binding_policy" => {
                self.with_client(
                    CreateBindingPolicyInput::from_arguments(args),
                    |api, input| async move { create_binding_policy(api.as_ref(), catalog, input).await },
                )
                .await
            }
            "list_binding_policies" => {
                self.with_client(parse_args::<ContextInput>(args), |api, _| async move {
                    list_binding_policies(api.as_ref()).await
                })
                .await
            }
            "delete_binding_policy" => {
                self.with_client(parse_args::<PolicyNameInput>(args), |api, input| async move {
                    delete_binding_policy(api.as_ref(), input).await
                })
                .await
            }
            "get_binding_policy_details" => {
                self.with_client(parse_args::<PolicyNameInput>(args), |api, input| async move {
                    get_binding_policy_details(api.as_ref(), input).await
                })
                .await
            }
            "get_binding_policy_status" => {
                self.with_client(parse_args::<PolicyNameInput>(args), |api, input| async move {
                    get_binding_policy_status(api.as_ref(), input).await
                })
                .await
            }

            // Cluster tools
            "list_all_clusters" => {
                self.with_client(parse_args::<ContextInput>(args), |api, _| async move {
                    list_all_clusters(api.as_ref()).await
                })
                .await
            }
            "get_cluster_details" => {
                self.with_client(parse_args::<ClusterNameInput>(args), |api, input| async move {
                    get_cluster_details(api.as_ref(), input).await
                })
                .await
            }
            "get_cluster_status" => {
                self.with_client(parse_args::<ClusterNameInput>(args), |api, input| async move {
                    get_cluster_status(api.as_ref(), input).await
                })
                .await
            }
            "get_cluster_logs" => {
                self.with_client(parse_args::<ClusterNameInput>(args), |api, input| async move {
                    get_cluster_logs(api.as_ref(), input).await
                })
                .await
            }

            // Namespace tools
            "create_namespace" => {
                self.with_client(parse_args::<NamespaceInput>(args), |api, input| async move {
                    create_namespace(api.as_ref(), input).await
                })
                .await
            }
            "create_labelled_namespace" => {
                self.with_client(
                    parse_args::<LabelledNamespaceInput>(args),
                    |api, input| async move { create_labelled_namespace(api.as_ref(), input).await },
                )
                .await
            }
            "delete_namespace" => {
                self.with_client(parse_args::<NamespaceInput>(args), |api, input| async move {
                    delete_namespace(api.as_ref(), input).await
                })
                .await
            }
            "list_namespaces" => {
                self.with_client(parse_args::<ContextInput>(args), |api, _| async move {
                    list_namespaces(api.as_ref()).await
                })
                .await
            }
            "get_namespace_details" => {
                self.with_client(parse_args::<NamespaceInput>(args), |api, input| async move {
                    get_namespace_details(api.as_ref(), input).await
                })
                .await
            }
            "get_namespace_status" => {
                self.with_client(parse_args::<NamespaceInput>(args), |api, input| async move {
                    get_namespace_status(api.as_ref(), input).await
                })
                .await
            }

            // Pod tools
            "list_pods" => {
                self.with_client(parse_args::<ListPodsInput>(args), |api, input| async move {
                    list_pods(api.as_ref(), input).await
                })
                .await
            }
            "get_nodes" => {
                self.with_client(parse_args::<ContextInput>(args), |api, _| async move {
                    get_nodes(api.as_ref()).await
                })
                .await
            }
            "create_pod" => {
                self.with_client(parse_args::<CreatePodInput>(args), |api, input| async move {
                    create_pod(api.as_ref(), input).await
                })
                .await
            }
            "delete_pod" => {
                self.with_client(parse_args::<PodInput>(args), |api, input| async move {
                    delete_pod(api.as_ref(), input).await
                })
                .await
            }
            "get_pod_logs" => {
                self.with_client(parse_args::<PodInput>(args), |api, input| async move {
                    get_pod_logs(api.as_ref(), input).await
                })
                .await
            }
            "get_pod_status" => {
                self.with_client(parse_args::<PodInput>(args), |api, input| async move {
                    get_pod_status(api.as_ref(), input).await
                })
                .await
            }
            "describe_pod" => {
                self.with_client(parse_args::<PodInput>(args), |api, input| async move {
                    describe_pod(api.as_ref(), input).await
                })
                .await
            }

            // WDS context tools
            "list_wds_contexts" => run_tool(Ok(()), |_| list_wds_contexts(contexts)).await,
            "get_wds_context_details" => {
                run_tool(parse_args::<ContextNameInput>(args), |input| {
                    get_wds_context_details(contexts, input)
                })
                .await
            }
            "create_wds_context" => {
                run_tool(parse_args::<CreateWdsContextInput>(args), |input| {
                    create_wds_context(contexts, input)
                })
                .await
            }
            "delete_wds_context" => {
                run_tool(parse_args::<ContextNameInput>(args), |input| {
                    delete_wds_context(contexts, input)
                })
                .await
            }
            "switch_wds_context" => {
                run_tool(parse_args::<ContextNameInput>(args), |input| {
                    switch_wds_context(contexts, input)
                })
                .await
            }

            _ => return None,
        };

        Some(result)
    }
}

/// Run a handler that needs no Kubernetes client.
async fn run_tool<I, O, F, Fut>(input: ToolResult<I>, handler: F) -> ToolResult<Value>
where
    O: Serialize,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = ToolResult<O>>,
{
    let output = handler(input?).await?;
    encode(&output)
}

/// Tool definitions for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolDefinitions {
    pub tools: Vec<ToolInfo>,
}

/// Information about a single tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// Input schema (JSON Schema)
    pub input_schema: Value,
}

impl ToolInfo {
    fn new<T: JsonSchema>(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default(),
        }
    }
}

impl ToolDefinitions {
    /// Get all available tool definitions.
    pub fn all() -> Self {
        Self {
            tools: vec![
                ToolInfo::new::<CreateBindingPolicyInput>(
                    "create_binding_policy",
                    "Create a KubeStellar BindingPolicy that syncs the selected workload resources to the selected clusters",
                ),
                ToolInfo::new::<ContextInput>(
                    "list_binding_policies",
                    "List all BindingPolicies in the cluster",
                ),
                ToolInfo::new::<PolicyNameInput>(
                    "delete_binding_policy",
                    "Delete a BindingPolicy by name",
                ),
                ToolInfo::new::<PolicyNameInput>(
                    "get_binding_policy_details",
                    "Get metadata, spec and status of a BindingPolicy",
                ),
                ToolInfo::new::<PolicyNameInput>(
                    "get_binding_policy_status",
                    "Get the status conditions and errors of a BindingPolicy",
                ),
                ToolInfo::new::<ContextInput>(
                    "list_all_clusters",
                    "List all clusters (nodes) of the selected context",
                ),
                ToolInfo::new::<ClusterNameInput>(
                    "get_cluster_details",
                    "Get the full object of a cluster (node)",
                ),
                ToolInfo::new::<ClusterNameInput>(
                    "get_cluster_status",
                    "Get the status of a cluster (node)",
                ),
                ToolInfo::new::<ClusterNameInput>(
                    "get_cluster_logs",
                    "Get logs served by a cluster's (node's) log endpoint",
                ),
                ToolInfo::new::<NamespaceInput>("create_namespace", "Create a namespace"),
                ToolInfo::new::<LabelledNamespaceInput>(
                    "create_labelled_namespace",
                    "Create a namespace with labels",
                ),
                ToolInfo::new::<NamespaceInput>("delete_namespace", "Delete a namespace"),
                ToolInfo::new::<ContextInput>("list_namespaces", "List all namespaces"),
                ToolInfo::new::<NamespaceInput>(
                    "get_namespace_details",
                    "Get the full object of a namespace",
                ),
                ToolInfo::new::<NamespaceInput>(
                    "get_namespace_status",
                    "Get the status of a namespace",
                ),
                ToolInfo::new::<ListPodsInput>(
                    "list_pods",
                    "List pods in a namespace, optionally filtered by label or field selector",
                ),
                ToolInfo::new::<ContextInput>("get_nodes", "List the nodes of the cluster"),
                ToolInfo::new::<CreatePodInput>(
                    "create_pod",
                    "Create a pod running a single container from the given image",
                ),
                ToolInfo::new::<PodInput>("delete_pod", "Delete a pod"),
                ToolInfo::new::<PodInput>("get_pod_logs", "Get the logs of a pod"),
                ToolInfo::new::<PodInput>("get_pod_status", "Get the status of a pod"),
                ToolInfo::new::<PodInput>("describe_pod", "Get the full object of a pod"),
                ToolInfo::new::<NoInput>(
                    "list_wds_contexts",
                    "List kubeconfig contexts that are Workload Description Spaces",
                ),
                ToolInfo::new::<ContextNameInput>(
                    "get_wds_context_details",
                    "Get the cluster and user of a WDS context",
                ),
                ToolInfo::new::<CreateWdsContextInput>(
                    "create_wds_context",
                    "Add a WDS context to the kubeconfig",
                ),
                ToolInfo::new::<ContextNameInput>(
                    "delete_wds_context",
                    "Remove a WDS context from the kubeconfig",
                ),
                ToolInfo::new::<ContextNameInput>(
                    "switch_wds_context",
                    "Make a WDS context the kubeconfig's current context",
                ),
            ],
        }
    }
}

// ============================================================================
// JSON-RPC Types
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn error_with_data(
        id: Option<Value>,
        code: i32,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: Some(data),
            }),
        }
    }
}

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// MCP tool result wrapping `value` as pretty-printed text.
fn tool_result(value: &impl Serialize, is_error: bool) -> Value {
    serde_json::json!({
        "content": [{
            "type": "text",
            "text": serde_json::to_string_pretty(value).unwrap_or_default()
        }],
        "isError": is_error
    })
}

// ============================================================================
// MCP Protocol Implementation
// ============================================================================

impl<P, X> KubestellarMcpServer<P, X>
where
    P: ClientProvider + 'static,
    X: ContextStore + 'static,
{
    /// Handle an incoming JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "Handling MCP request");

        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            );
        }

        match request.method.as_str() {
            // MCP Protocol Methods
            "initialize" => self.handle_initialize(request.id, request.params).await,
            "initialized" | "notifications/initialized" => {
                self.handle_initialized(request.id).await
            }
            "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),

            // Tool Methods
            "tools/list" => self.handle_tools_list(request.id).await,
            "tools/call" => self.handle_tools_call(request.id, request.params).await,

            // Resource Methods
            "resources/list" => self.handle_resources_list(request.id).await,
            "resources/read" => self.handle_resources_read(request.id, request.params).await,

            _ => {
                warn!(method = %request.method, "Unknown method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                )
            }
        }
    }

    async fn handle_initialize(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        #[derive(Debug, Default, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct InitializeParams {
            #[serde(default)]
            protocol_version: Option<String>,
            #[serde(default)]
            client_info: Option<Value>,
        }

        let params: InitializeParams = if params.is_null() {
            InitializeParams::default()
        } else {
            match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    );
                }
            }
        };
        debug!(
            requested_version = ?params.protocol_version,
            client = ?params.client_info,
            "Client initializing"
        );

        let server_info = Self::server_info();
        let result = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "resources": {
                    "subscribe": false,
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": server_info.name,
                "version": server_info.version
            }
        });

        info!("MCP server initialized");
        JsonRpcResponse::success(id, result)
    }

    async fn handle_initialized(&self, id: Option<Value>) -> JsonRpcResponse {
        debug!("Client sent initialized notification");
        JsonRpcResponse::success(id, serde_json::json!({}))
    }

    async fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = ToolDefinitions::all()
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        JsonRpcResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    /// Handle tools/call; tool failures are results with `isError`, not JSON-RPC errors.
    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        #[derive(Debug, Deserialize)]
        struct ToolCallParams {
            name: String,
            #[serde(default)]
            arguments: Value,
        }

        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
        };

        let context = params
            .arguments
            .get("context")
            .and_then(Value::as_str)
            .unwrap_or("current")
            .to_string();
        let span = tool_span!(params.name, context);

        let outcome = self
            .call_tool(&params.name, params.arguments)
            .instrument(span.clone())
            .await;

        let result = match outcome {
            None => {
                warn!(tool = %params.name, "Unknown tool");
                return JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown tool: {}", params.name),
                );
            }
            Some(Ok(value)) => {
                span.in_scope(|| debug!("Tool call succeeded"));
                tool_result(&value, false)
            }
            Some(Err(err)) => {
                span.in_scope(|| warn!(error = %err, "Tool call failed"));
                tool_result(&err.payload(&params.name), true)
            }
        };

        JsonRpcResponse::success(id, result)
    }

    async fn handle_resources_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let resource_list: Vec<Value> = resources::list_available_resources()
            .iter()
            .map(|r| {
                serde_json::json!({
                    "uri": r.uri,
                    "name": r.name,
                    "description": r.description,
                    "mimeType": r.mime_type
                })
            })
            .collect();

        JsonRpcResponse::success(id, serde_json::json!({ "resources": resource_list }))
    }

    async fn read_resource(&self, path: ResourcePath) -> ToolResult<Value> {
        let contexts: &dyn ContextStore = self.contexts.as_ref();

        match path {
            ResourcePath::BindingPolicyList => {
                self.with_client(Ok(ContextInput::default()), |api, _| async move {
                    list_binding_policies(api.as_ref()).await
                })
                .await
            }
            ResourcePath::BindingPolicy(name) => {
                let input = PolicyNameInput {
                    policy_name: name,
                    context: None,
                };
                self.with_client(Ok(input), |api, input| async move {
                    get_binding_policy_details(api.as_ref(), input).await
                })
                .await
            }
            ResourcePath::ContextList => {
                run_tool(Ok(()), |_| resources::read_contexts(contexts)).await
            }
            ResourcePath::WdsContextList => {
                run_tool(Ok(()), |_| list_wds_contexts(contexts)).await
            }
        }
    }

    async fn handle_resources_read(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        #[derive(Debug, Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params: ReadParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
        };

        let resource_path = match resources::parse_resource_uri(&params.uri) {
            Some(p) => p,
            None => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid resource URI: {}", params.uri),
                );
            }
        };

        let content = match self
            .read_resource(resource_path)
            .instrument(observability::resource_span!(params.uri))
            .await
        {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_default(),
            Err(err @ ToolError::NotFound { .. }) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string());
            }
            Err(err) => {
                let data = serde_json::to_value(err.payload("resources/read")).unwrap_or_default();
                return JsonRpcResponse::error_with_data(id, INTERNAL_ERROR, err.to_string(), data);
            }
        };

        let result = serde_json::json!({
            "contents": [{
                "uri": params.uri,
                "mimeType": "application/json",
                "text": content
            }]
        });

        JsonRpcResponse::success(id, result)
    }

    /// Run the MCP server over stdio until stdin closes.
    pub async fn serve_stdio(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        info!("MCP server listening on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            debug!(request = %line, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => {
                    let is_notification = request.id.is_none();
                    let response = self.handle_request(request).await;
                    if is_notification {
                        continue;
                    }
                    response
                }
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e))
                }
            };

            let response_json = serde_json::to_string(&response)?;
            debug!(response = %response_json, "Sending response");

            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        info!("MCP server shutdown");
        Ok(())
    }
}
