//! Namespace MCP tools.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Namespace, NamespaceStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use kube_api_interface::KubeApi;

use super::context_arg;
use crate::error::{ToolError, ToolResult};

/// Input for tools addressing one namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NamespaceInput {
    /// Name of the namespace
    pub namespace: String,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

/// Input for creating a namespace with labels
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LabelledNamespaceInput {
    /// Name of the namespace
    pub namespace: String,
    /// Labels to put on the namespace
    pub labels: BTreeMap<String, String>,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

context_arg!(NamespaceInput, LabelledNamespaceInput);

fn namespace_manifest(name: &str, labels: Option<BTreeMap<String, String>>) -> ToolResult<Namespace> {
    if name.trim().is_empty() {
        return Err(ToolError::invalid_input("Namespace name cannot be empty"));
    }
    Ok(Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels,
            ..Default::default()
        },
        ..Default::default()
    })
}

pub async fn create_namespace(api: &dyn KubeApi, input: NamespaceInput) -> ToolResult<Namespace> {
    let manifest = namespace_manifest(&input.namespace, None)?;
    let created = api.create_namespace(&manifest).await?;
    info!(namespace = %input.namespace, "Created namespace");
    Ok(created)
}

pub async fn create_labelled_namespace(
    api: &dyn KubeApi,
    input: LabelledNamespaceInput,
) -> ToolResult<Namespace> {
    let manifest = namespace_manifest(&input.namespace, Some(input.labels))?;
    let created = api.create_namespace(&manifest).await?;
    info!(namespace = %input.namespace, "Created labelled namespace");
    Ok(created)
}

/// Returns whatever the API server answered the delete with.
pub async fn delete_namespace(api: &dyn KubeApi, input: NamespaceInput) -> ToolResult<Value> {
    Ok(api.delete_namespace(&input.namespace).await?)
}

pub async fn list_namespaces(api: &dyn KubeApi) -> ToolResult<Vec<Namespace>> {
    Ok(api.list_namespaces().await?)
}

pub async fn get_namespace_details(
    api: &dyn KubeApi,
    input: NamespaceInput,
) -> ToolResult<Namespace> {
    Ok(api.get_namespace(&input.namespace).await?)
}

pub async fn get_namespace_status(
    api: &dyn KubeApi,
    input: NamespaceInput,
) -> ToolResult<NamespaceStatus> {
    let namespace = api.get_namespace(&input.namespace).await?;
    Ok(namespace.status.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_api::mock::MockKubeApi;

    fn input(name: &str) -> NamespaceInput {
        NamespaceInput {
            namespace: name.to_string(),
            context: None,
        }
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let api = MockKubeApi::new();
        create_namespace(&api, input("team-a")).await.unwrap();
        create_labelled_namespace(
            &api,
            LabelledNamespaceInput {
                namespace: "team-b".into(),
                labels: BTreeMap::from([("env".to_string(), "prod".to_string())]),
                context: None,
            },
        )
        .await
        .unwrap();

        let names: Vec<String> = list_namespaces(&api)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect();
        assert_eq!(names, vec!["team-a", "team-b"]);

        let labelled = get_namespace_details(&api, input("team-b")).await.unwrap();
        assert_eq!(
            labelled.metadata.labels.unwrap().get("env").map(String::as_str),
            Some("prod")
        );

        let deleted = delete_namespace(&api, input("team-a")).await.unwrap();
        assert_eq!(deleted["metadata"]["name"], "team-a");
        assert_eq!(list_namespaces(&api).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_existing_is_upstream_conflict() {
        let api = MockKubeApi::new();
        create_namespace(&api, input("team-a")).await.unwrap();

        let err = create_namespace(&api, input("team-a")).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_empty_name_rejected_before_api() {
        let api = MockKubeApi::new();
        let err = create_namespace(&api, input(" ")).await.unwrap_err();

        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_of_missing_namespace() {
        let api = MockKubeApi::new();
        let err = get_namespace_status(&api, input("ghost")).await.unwrap_err();
        assert_eq!(err, ToolError::not_found("Namespace", "ghost"));
    }
}
