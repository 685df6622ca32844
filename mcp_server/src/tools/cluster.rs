//! Cluster MCP tools.
//!
//! The nodes of the selected context's cluster are reported as clusters.

use k8s_openapi::api::core::v1::{Node, NodeStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use kube_api_interface::KubeApi;

use super::context_arg;
use crate::error::ToolResult;

/// Input for tools addressing one cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClusterNameInput {
    /// Name of the cluster (node)
    pub cluster_name: String,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

context_arg!(ClusterNameInput);

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClusterLogsOutput {
    pub cluster_name: String,
    pub logs: String,
}

pub async fn list_all_clusters(api: &dyn KubeApi) -> ToolResult<Vec<Node>> {
    Ok(api.list_nodes().await?)
}

pub async fn get_cluster_details(api: &dyn KubeApi, input: ClusterNameInput) -> ToolResult<Node> {
    Ok(api.get_node(&input.cluster_name).await?)
}

pub async fn get_cluster_status(
    api: &dyn KubeApi,
    input: ClusterNameInput,
) -> ToolResult<NodeStatus> {
    let node = api.get_node(&input.cluster_name).await?;
    Ok(node.status.unwrap_or_default())
}

/// Logs from the node proxy endpoint.
pub async fn get_cluster_logs(
    api: &dyn KubeApi,
    input: ClusterNameInput,
) -> ToolResult<ClusterLogsOutput> {
    let logs = api.node_logs(&input.cluster_name).await?;
    Ok(ClusterLogsOutput {
        cluster_name: input.cluster_name,
        logs,
    })
}
