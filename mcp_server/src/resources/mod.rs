//! MCP resources for read-only KubeStellar state.
//!
//! Resource URI scheme: `kubestellar://`
//!
//! - `kubestellar://bindingpolicies` - all binding policies
//! - `kubestellar://bindingpolicies/{name}` - one binding policy
//! - `kubestellar://contexts` - kubeconfig contexts and the current one
//! - `kubestellar://contexts/wds` - WDS context names

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use kube_api_interface::{ContextInfo, ContextStore};

use crate::error::ToolResult;

const SCHEME: &str = "kubestellar://";

/// Resource info for listing
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

impl ResourceInfo {
    fn json(path: &str, name: &str, description: &str) -> Self {
        Self {
            uri: format!("{}{}", SCHEME, path),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
        }
    }
}

/// Contents of `kubestellar://contexts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextsResource {
    pub current_context: Option<String>,
    pub contexts: Vec<ContextInfo>,
}

pub fn list_available_resources() -> Vec<ResourceInfo> {
    vec![
        ResourceInfo::json(
            "bindingpolicies",
            "Binding Policies",
            "All KubeStellar binding policies in the default context",
        ),
        ResourceInfo::json(
            "contexts",
            "Kubeconfig Contexts",
            "Kubeconfig contexts and the current context",
        ),
        ResourceInfo::json(
            "contexts/wds",
            "WDS Contexts",
            "Names of Workload Description Space contexts",
        ),
    ]
}

/// Snapshot of the kubeconfig contexts.
pub async fn read_contexts(store: &dyn ContextStore) -> ToolResult<ContextsResource> {
    Ok(ContextsResource {
        current_context: store.current_context().await?,
        contexts: store.list_contexts().await?,
    })
}

/// Parsed resource path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    BindingPolicyList,
    BindingPolicy(String),
    ContextList,
    WdsContextList,
}

pub fn parse_resource_uri(uri: &str) -> Option<ResourcePath> {
    let stripped = uri.strip_prefix(SCHEME)?;
    let parts: Vec<&str> = stripped.split('/').collect();

    match parts.as_slice() {
        ["bindingpolicies"] => Some(ResourcePath::BindingPolicyList),
        ["bindingpolicies", name] if !name.is_empty() => {
            Some(ResourcePath::BindingPolicy(name.to_string()))
        }
        ["contexts"] => Some(ResourcePath::ContextList),
        ["contexts", "wds"] => Some(ResourcePath::WdsContextList),
        _ => None,
    }
}
