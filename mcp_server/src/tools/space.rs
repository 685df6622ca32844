//! Workload Description Space context tools.
//!
//! A WDS is a kubeconfig context whose name starts with `wds`. Creating,
//! deleting and switching contexts edits the kubeconfig through the
//! [`ContextStore`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use kube_api_interface::{ContextInfo, ContextStore};

use crate::error::{ToolError, ToolResult};

/// Prefix identifying WDS contexts.
pub const WDS_PREFIX: &str = "wds";

const WDS_KIND: &str = "WDS context";

/// Input for tools addressing one context
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContextNameInput {
    /// Name of the kubeconfig context
    pub context_name: String,
}

/// Input for creating a WDS context
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateWdsContextInput {
    /// Name of the new context
    pub context_name: String,
    /// Cluster entry the context points at
    pub cluster_name: String,
    /// User entry the context authenticates as
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContextRef {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WdsContextDetails {
    pub name: String,
    pub context: ContextRef,
    pub cluster: String,
    pub user: String,
}

impl From<ContextInfo> for WdsContextDetails {
    fn from(info: ContextInfo) -> Self {
        Self {
            context: ContextRef {
                cluster: info.cluster.clone(),
                user: info.user.clone(),
                namespace: info.namespace,
            },
            name: info.name,
            cluster: info.cluster,
            user: info.user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateWdsContextOutput {
    pub message: String,
    pub name: String,
    pub context: ContextRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContextMessage {
    pub message: String,
}

fn require_name(name: &str) -> ToolResult<()> {
    if name.trim().is_empty() {
        return Err(ToolError::invalid_input("Context name cannot be empty"));
    }
    Ok(())
}

async fn ensure_exists(store: &dyn ContextStore, name: &str) -> ToolResult<ContextInfo> {
    store
        .get_context(name)
        .await?
        .ok_or_else(|| ToolError::not_found(WDS_KIND, name))
}

/// Names of all contexts starting with `wds`.
pub async fn list_wds_contexts(store: &dyn ContextStore) -> ToolResult<Vec<String>> {
    Ok(store
        .list_contexts()
        .await?
        .into_iter()
        .map(|c| c.name)
        .filter(|name| name.starts_with(WDS_PREFIX))
        .collect())
}

pub async fn get_wds_context_details(
    store: &dyn ContextStore,
    input: ContextNameInput,
) -> ToolResult<WdsContextDetails> {
    Ok(ensure_exists(store, &input.context_name).await?.into())
}

pub async fn create_wds_context(
    store: &dyn ContextStore,
    input: CreateWdsContextInput,
) -> ToolResult<CreateWdsContextOutput> {
    require_name(&input.context_name)?;

    let context = ContextInfo::new(&input.context_name, &input.cluster_name, &input.user_name);
    store.add_context(context).await?;
    info!(context = %input.context_name, cluster = %input.cluster_name, "Created WDS context");

    Ok(CreateWdsContextOutput {
        message: format!("WDS context '{}' has been created", input.context_name),
        name: input.context_name,
        context: ContextRef {
            cluster: input.cluster_name,
            user: input.user_name,
            namespace: None,
        },
    })
}

pub async fn delete_wds_context(
    store: &dyn ContextStore,
    input: ContextNameInput,
) -> ToolResult<ContextMessage> {
    ensure_exists(store, &input.context_name).await?;
    store.remove_context(&input.context_name).await?;

    Ok(ContextMessage {
        message: format!("WDS context '{}' has been deleted.", input.context_name),
    })
}

pub async fn switch_wds_context(
    store: &dyn ContextStore,
    input: ContextNameInput,
) -> ToolResult<ContextMessage> {
    ensure_exists(store, &input.context_name).await?;
    store.use_context(&input.context_name).await?;

    Ok(ContextMessage {
        message: format!("Switched to WDS context '{}'.", input.context_name),
    })
}
