//! Pod and node MCP tools.

use k8s_openapi::api::core::v1::{Container, Node, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use kube_api_interface::KubeApi;

use super::context_arg;
use crate::error::{ToolError, ToolResult};

fn default_namespace() -> String {
    "default".to_string()
}

/// Input for listing pods
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListPodsInput {
    /// Namespace to list pods in
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Label selector, e.g. "app=nginx"
    #[serde(default)]
    pub label_selector: Option<String>,
    /// Field selector, e.g. "spec.nodeName=node-1"
    #[serde(default)]
    pub field_selector: Option<String>,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

/// Input for tools addressing one pod
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PodInput {
    /// Namespace of the pod
    pub namespace: String,
    /// Name of the pod
    pub pod_name: String,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

/// Input for creating a single-container pod
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreatePodInput {
    /// Namespace to create the pod in
    pub namespace: String,
    /// Name of the pod and of its container
    pub pod_name: String,
    /// Container image, e.g. "nginx:latest"
    pub image: String,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

context_arg!(ListPodsInput, PodInput, CreatePodInput);

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PodLogsOutput {
    pub namespace: String,
    pub pod_name: String,
    pub logs: String,
}

pub async fn list_pods(api: &dyn KubeApi, input: ListPodsInput) -> ToolResult<Vec<Pod>> {
    Ok(api
        .list_pods(
            &input.namespace,
            input.label_selector.as_deref(),
            input.field_selector.as_deref(),
        )
        .await?)
}

pub async fn get_nodes(api: &dyn KubeApi) -> ToolResult<Vec<Node>> {
    Ok(api.list_nodes().await?)
}

pub async fn create_pod(api: &dyn KubeApi, input: CreatePodInput) -> ToolResult<Pod> {
    if input.pod_name.trim().is_empty() {
        return Err(ToolError::invalid_input("Pod name cannot be empty"));
    }
    if input.image.trim().is_empty() {
        return Err(ToolError::invalid_input("Image cannot be empty"));
    }

    let manifest = Pod {
        metadata: ObjectMeta {
            name: Some(input.pod_name.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: input.pod_name.clone(),
                image: Some(input.image.clone()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    };

    let created = api.create_pod(&input.namespace, &manifest).await?;
    info!(namespace = %input.namespace, pod = %input.pod_name, image = %input.image, "Created pod");
    Ok(created)
}

pub async fn delete_pod(api: &dyn KubeApi, input: PodInput) -> ToolResult<Value> {
    Ok(api.delete_pod(&input.namespace, &input.pod_name).await?)
}

pub async fn get_pod_logs(api: &dyn KubeApi, input: PodInput) -> ToolResult<PodLogsOutput> {
    let logs = api.pod_logs(&input.namespace, &input.pod_name).await?;
    Ok(PodLogsOutput {
        namespace: input.namespace,
        pod_name: input.pod_name,
        logs,
    })
}

pub async fn get_pod_status(api: &dyn KubeApi, input: PodInput) -> ToolResult<PodStatus> {
    let pod = api.get_pod(&input.namespace, &input.pod_name).await?;
    Ok(pod.status.unwrap_or_default())
}

pub async fn describe_pod(api: &dyn KubeApi, input: PodInput) -> ToolResult<Pod> {
    Ok(api.get_pod(&input.namespace, &input.pod_name).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::parse_args;
    use kube_api::mock::MockKubeApi;
    use serde_json::json;

    fn pod_input(name: &str) -> PodInput {
        PodInput {
            namespace: "default".into(),
            pod_name: name.into(),
            context: None,
        }
    }

    #[test]
    fn test_list_pods_defaults_namespace() {
        let input: ListPodsInput = parse_args(json!({})).unwrap();
        assert_eq!(input.namespace, "default");
        assert!(input.label_selector.is_none());
    }

    #[tokio::test]
    async fn test_create_pod_single_container() {
        let api = MockKubeApi::new();
        let pod = create_pod(
            &api,
            CreatePodInput {
                namespace: "default".into(),
                pod_name: "web".into(),
                image: "nginx:1.25".into(),
                context: None,
            },
        )
        .await
        .unwrap();

        let containers = pod.spec.unwrap().containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "web");
        assert_eq!(containers[0].image.as_deref(), Some("nginx:1.25"));

        let described = describe_pod(&api, pod_input("web")).await.unwrap();
        assert_eq!(described.metadata.namespace.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn test_pod_logs_and_delete() {
        let api = MockKubeApi::new();
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        api.insert_pod("default", pod, "listening on :80").await;

        let logs = get_pod_logs(&api, pod_input("web")).await.unwrap();
        assert_eq!(logs.logs, "listening on :80");

        delete_pod(&api, pod_input("web")).await.unwrap();
        let err = get_pod_status(&api, pod_input("web")).await.unwrap_err();
        assert_eq!(err, ToolError::not_found("Pod", "web"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_structured() {
        let api = MockKubeApi::new();
        api.fail_operation("list_pods", 403).await;

        let input: ListPodsInput = parse_args(json!({"namespace": "kube-system"})).unwrap();
        let err = list_pods(&api, input).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream { status: 403, .. }));
    }
}
