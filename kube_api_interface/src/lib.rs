use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kubestellar_shared_types::BindingPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by Kubernetes client implementations.
#[derive(Debug, Error)]
pub enum KubeApiError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// Non-2xx response from the API server other than a handled 404.
    #[error("Kubernetes API error: {status}")]
    Api {
        status: u16,
        message: String,
        body: Option<String>,
    },

    #[error("Context '{0}' not found")]
    ContextNotFound(String),

    #[error("Context '{0}' already exists")]
    ContextExists(String),

    #[error("Kubeconfig error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl KubeApiError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// HTTP status this error corresponds to, when it came from the API server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<kube::Error> for KubeApiError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => KubeApiError::Api {
                status: response.code,
                message: response.message.clone(),
                body: serde_json::to_string(&response).ok(),
            },
            kube::Error::SerdeError(e) => KubeApiError::Serialization(e.to_string()),
            other => KubeApiError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for KubeApiError {
    fn from(err: serde_json::Error) -> Self {
        KubeApiError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KubeApiError>;

/// Kubernetes operations the tool surface relies on.
///
/// One value is bound to one set of credentials (one kubeconfig context).
/// Lookups by name report a missing object as [`KubeApiError::NotFound`].
#[async_trait]
pub trait KubeApi: Send + Sync {
    // ===== BindingPolicy Operations =====

    /// List `bindingpolicies` at the given API version to check it is served.
    async fn check_binding_policies(&self, version: &str) -> Result<()>;

    async fn list_binding_policies(&self) -> Result<Vec<BindingPolicy>>;

    async fn get_binding_policy(&self, name: &str) -> Result<BindingPolicy>;

    async fn create_binding_policy(&self, policy: &BindingPolicy) -> Result<BindingPolicy>;

    async fn delete_binding_policy(&self, name: &str) -> Result<()>;

    // ===== Node Operations =====

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn get_node(&self, name: &str) -> Result<Node>;

    /// Logs served by the kubelet's node proxy endpoint.
    async fn node_logs(&self, name: &str) -> Result<String>;

    // ===== Namespace Operations =====

    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;

    async fn get_namespace(&self, name: &str) -> Result<Namespace>;

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace>;

    /// Delete a namespace, returning the object or status the server answered with.
    async fn delete_namespace(&self, name: &str) -> Result<Value>;

    // ===== Pod Operations =====

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<Pod>>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod>;

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<Value>;

    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<String>;
}

/// Resolves a kubeconfig context into a client bound to its credentials.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// `None` selects the configured default or the kubeconfig's current context.
    async fn client(&self, context: Option<&str>) -> Result<Arc<dyn KubeApi>>;
}

/// A named kubeconfig context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ContextInfo {
    pub fn new(
        name: impl Into<String>,
        cluster: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cluster: cluster.into(),
            user: user.into(),
            namespace: None,
        }
    }
}

/// Listing and editing of kubeconfig contexts.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn list_contexts(&self) -> Result<Vec<ContextInfo>>;

    async fn current_context(&self) -> Result<Option<String>>;

    async fn get_context(&self, name: &str) -> Result<Option<ContextInfo>> {
        Ok(self
            .list_contexts()
            .await?
            .into_iter()
            .find(|c| c.name == name))
    }

    /// Add a context; fails with [`KubeApiError::ContextExists`] on a name clash.
    async fn add_context(&self, context: ContextInfo) -> Result<()>;

    async fn remove_context(&self, name: &str) -> Result<()>;

    /// Make `name` the current context.
    async fn use_context(&self, name: &str) -> Result<()>;
}
