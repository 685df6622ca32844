//! [`KubeApi`] implementation backed by a kube-rs [`Client`].

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde_json::Value;
use tracing::{debug, info};

use kube_api_interface::{KubeApi, KubeApiError, Result};
use kubestellar_shared_types::{
    BindingPolicy, BINDING_POLICY_GROUP, BINDING_POLICY_KIND, BINDING_POLICY_PLURAL,
};

/// Kubernetes client bound to one set of credentials.
#[derive(Clone)]
pub struct KubeRsApi {
    client: Client,
}

impl KubeRsApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn policies(&self) -> Api<BindingPolicy> {
        Api::all(self.client.clone())
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a 404 on a named lookup to [`KubeApiError::NotFound`].
fn lookup_error<'a>(kind: &'a str, name: &'a str) -> impl FnOnce(kube::Error) -> KubeApiError + 'a {
    move |err| match err {
        kube::Error::Api(response) if response.code == 404 => KubeApiError::not_found(kind, name),
        other => other.into(),
    }
}

#[async_trait]
impl KubeApi for KubeRsApi {
    async fn check_binding_policies(&self, version: &str) -> Result<()> {
        let gvk = GroupVersionKind::gvk(BINDING_POLICY_GROUP, version, BINDING_POLICY_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, BINDING_POLICY_PLURAL);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        api.list(&ListParams::default().limit(1)).await?;
        debug!(version, "BindingPolicy API is served");
        Ok(())
    }

    async fn list_binding_policies(&self) -> Result<Vec<BindingPolicy>> {
        let list = self.policies().list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "Listed binding policies");
        Ok(list.items)
    }

    async fn get_binding_policy(&self, name: &str) -> Result<BindingPolicy> {
        self.policies()
            .get(name)
            .await
            .map_err(lookup_error("Binding policy", name))
    }

    async fn create_binding_policy(&self, policy: &BindingPolicy) -> Result<BindingPolicy> {
        let created = self
            .policies()
            .create(&PostParams::default(), policy)
            .await?;
        info!(
            policy = created.metadata.name.as_deref().unwrap_or_default(),
            "Created binding policy"
        );
        Ok(created)
    }

    async fn delete_binding_policy(&self, name: &str) -> Result<()> {
        self.policies()
            .delete(name, &DeleteParams::default())
            .await
            .map_err(lookup_error("Binding policy", name))?;
        info!(policy = name, "Deleted binding policy");
        Ok(())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.nodes().list(&ListParams::default()).await?.items)
    }

    async fn get_node(&self, name: &str) -> Result<Node> {
        self.nodes()
            .get(name)
            .await
            .map_err(lookup_error("Node", name))
    }

    async fn node_logs(&self, name: &str) -> Result<String> {
        let request = http::Request::get(format!("/api/v1/nodes/{}/proxy/logs/", name))
            .body(Vec::new())
            .map_err(|e| KubeApiError::Transport(e.to_string()))?;

        self.client
            .request_text(request)
            .await
            .map_err(lookup_error("Node", name))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        Ok(self.namespaces().list(&ListParams::default()).await?.items)
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        self.namespaces()
            .get(name)
            .await
            .map_err(lookup_error("Namespace", name))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace> {
        let created = self
            .namespaces()
            .create(&PostParams::default(), namespace)
            .await?;
        info!(
            namespace = created.metadata.name.as_deref().unwrap_or_default(),
            "Created namespace"
        );
        Ok(created)
    }

    async fn delete_namespace(&self, name: &str) -> Result<Value> {
        let response = self
            .namespaces()
            .delete(name, &DeleteParams::default())
            .await
            .map_err(lookup_error("Namespace", name))?;
        info!(namespace = name, "Deleted namespace");
        Ok(response.either(serde_json::to_value, serde_json::to_value)?)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<Pod>> {
        let mut params = ListParams::default();
        if let Some(labels) = label_selector {
            params = params.labels(labels);
        }
        if let Some(fields) = field_selector {
            params = params.fields(fields);
        }

        Ok(self.pods(namespace).list(&params).await?.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.pods(namespace)
            .get(name)
            .await
            .map_err(lookup_error("Pod", name))
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let created = self
            .pods(namespace)
            .create(&PostParams::default(), pod)
            .await?;
        info!(
            namespace,
            pod = created.metadata.name.as_deref().unwrap_or_default(),
            "Created pod"
        );
        Ok(created)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<Value> {
        let response = self
            .pods(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(lookup_error("Pod", name))?;
        info!(namespace, pod = name, "Deleted pod");
        Ok(response.either(serde_json::to_value, serde_json::to_value)?)
    }

    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<String> {
        self.pods(namespace)
            .logs(name, &LogParams::default())
            .await
            .map_err(lookup_error("Pod", name))
    }
}
