//! In-memory Kubernetes fakes for tests and offline development.
//!
//! [`MockKubeApi`] keeps objects in maps and records every call so tests can
//! assert which API operations a tool performed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use kube_api_interface::{
    ClientProvider, ContextInfo, ContextStore, KubeApi, KubeApiError, Result,
};
use kubestellar_shared_types::{BindingPolicy, BINDING_POLICY_VERSION};

#[derive(Debug, Default)]
struct MockState {
    served_versions: BTreeSet<String>,
    policies: BTreeMap<String, BindingPolicy>,
    nodes: BTreeMap<String, Node>,
    node_logs: BTreeMap<String, String>,
    namespaces: BTreeMap<String, Namespace>,
    pods: BTreeMap<(String, String), Pod>,
    pod_logs: BTreeMap<(String, String), String>,
    failures: BTreeMap<String, u16>,
    calls: Vec<String>,
}

impl MockState {
    /// Record `operation` and return an injected failure if one is set.
    fn enter(&mut self, operation: &str) -> Result<()> {
        self.calls.push(operation.to_string());
        match self.failures.get(operation) {
            Some(&status) => Err(KubeApiError::Api {
                status,
                message: format!("injected failure for {}", operation),
                body: None,
            }),
            None => Ok(()),
        }
    }
}

fn already_exists(kind: &str, name: &str) -> KubeApiError {
    KubeApiError::Api {
        status: 409,
        message: format!("{} \"{}\" already exists", kind, name),
        body: None,
    }
}

fn object_name(meta: &ObjectMeta) -> Result<String> {
    meta.name.clone().ok_or_else(|| KubeApiError::Api {
        status: 422,
        message: "metadata.name: Required value".to_string(),
        body: None,
    })
}

/// `k=v,k2=v2` equality selectors; anything else matches nothing.
fn selector_matches(selector: &str, lookup: impl Fn(&str) -> Option<String>) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => lookup(key.trim()).as_deref() == Some(value.trim()),
            None => false,
        })
}

fn pod_field(pod: &Pod, field: &str) -> Option<String> {
    match field {
        "metadata.name" => pod.metadata.name.clone(),
        "metadata.namespace" => pod.metadata.namespace.clone(),
        "spec.nodeName" => pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        "status.phase" => pod.status.as_ref().and_then(|s| s.phase.clone()),
        _ => None,
    }
}

/// In-memory [`KubeApi`].
#[derive(Debug, Clone)]
pub struct MockKubeApi {
    state: Arc<RwLock<MockState>>,
}

impl Default for MockKubeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockKubeApi {
    /// Empty cluster serving the BindingPolicy API at v1alpha1.
    pub fn new() -> Self {
        let state = MockState {
            served_versions: BTreeSet::from([BINDING_POLICY_VERSION.to_string()]),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Replace the set of BindingPolicy API versions the fake serves.
    pub async fn serve_versions(&self, versions: &[&str]) {
        self.state.write().await.served_versions =
            versions.iter().map(|v| v.to_string()).collect();
    }

    /// Make every call to `operation` fail with the given HTTP status.
    pub async fn fail_operation(&self, operation: &str, status: u16) {
        self.state
            .write()
            .await
            .failures
            .insert(operation.to_string(), status);
    }

    pub async fn insert_policy(&self, policy: BindingPolicy) {
        let name = policy.metadata.name.clone().unwrap_or_default();
        self.state.write().await.policies.insert(name, policy);
    }

    pub async fn insert_node(&self, node: Node, logs: impl Into<String>) {
        let name = node.metadata.name.clone().unwrap_or_default();
        let mut state = self.state.write().await;
        state.node_logs.insert(name.clone(), logs.into());
        state.nodes.insert(name, node);
    }

    pub async fn insert_namespace(&self, namespace: Namespace) {
        let name = namespace.metadata.name.clone().unwrap_or_default();
        self.state.write().await.namespaces.insert(name, namespace);
    }

    pub async fn insert_pod(&self, namespace: &str, mut pod: Pod, logs: impl Into<String>) {
        pod.metadata.namespace = Some(namespace.to_string());
        let key = (
            namespace.to_string(),
            pod.metadata.name.clone().unwrap_or_default(),
        );
        let mut state = self.state.write().await;
        state.pod_logs.insert(key.clone(), logs.into());
        state.pods.insert(key, pod);
    }

    pub async fn policy(&self, name: &str) -> Option<BindingPolicy> {
        self.state.read().await.policies.get(name).cloned()
    }

    /// Operation names in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| *c == operation)
            .count()
    }
}

#[async_trait]
impl KubeApi for MockKubeApi {
    async fn check_binding_policies(&self, version: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.enter("check_binding_policies")?;
        if state.served_versions.contains(version) {
            Ok(())
        } else {
            Err(KubeApiError::Api {
                status: 404,
                message: "the server could not find the requested resource".to_string(),
                body: None,
            })
        }
    }

    async fn list_binding_policies(&self) -> Result<Vec<BindingPolicy>> {
        let mut state = self.state.write().await;
        state.enter("list_binding_policies")?;
        Ok(state.policies.values().cloned().collect())
    }

    async fn get_binding_policy(&self, name: &str) -> Result<BindingPolicy> {
        let mut state = self.state.write().await;
        state.enter("get_binding_policy")?;
        state
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| KubeApiError::not_found("Binding policy", name))
    }

    async fn create_binding_policy(&self, policy: &BindingPolicy) -> Result<BindingPolicy> {
        let mut state = self.state.write().await;
        state.enter("create_binding_policy")?;
        let name = object_name(&policy.metadata)?;
        if state.policies.contains_key(&name) {
            return Err(already_exists("bindingpolicies.control.kubestellar.io", &name));
        }

        let mut created = policy.clone();
        created.metadata.uid = Some(format!("uid-{}", name));
        created.metadata.generation = Some(1);
        state.policies.insert(name.clone(), created.clone());
        debug!("MockKubeApi: Created binding policy {}", name);
        Ok(created)
    }

    async fn delete_binding_policy(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.enter("delete_binding_policy")?;
        state
            .policies
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| KubeApiError::not_found("Binding policy", name))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let mut state = self.state.write().await;
        state.enter("list_nodes")?;
        Ok(state.nodes.values().cloned().collect())
    }

    async fn get_node(&self, name: &str) -> Result<Node> {
        let mut state = self.state.write().await;
        state.enter("get_node")?;
        state
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| KubeApiError::not_found("Node", name))
    }

    async fn node_logs(&self, name: &str) -> Result<String> {
        let mut state = self.state.write().await;
        state.enter("node_logs")?;
        state
            .node_logs
            .get(name)
            .cloned()
            .ok_or_else(|| KubeApiError::not_found("Node", name))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let mut state = self.state.write().await;
        state.enter("list_namespaces")?;
        Ok(state.namespaces.values().cloned().collect())
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        let mut state = self.state.write().await;
        state.enter("get_namespace")?;
        state
            .namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| KubeApiError::not_found("Namespace", name))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace> {
        let mut state = self.state.write().await;
        state.enter("create_namespace")?;
        let name = object_name(&namespace.metadata)?;
        if state.namespaces.contains_key(&name) {
            return Err(already_exists("namespaces", &name));
        }

        state.namespaces.insert(name, namespace.clone());
        Ok(namespace.clone())
    }

    async fn delete_namespace(&self, name: &str) -> Result<Value> {
        let mut state = self.state.write().await;
        state.enter("delete_namespace")?;
        let removed = state
            .namespaces
            .remove(name)
            .ok_or_else(|| KubeApiError::not_found("Namespace", name))?;
        state.pods.retain(|(ns, _), _| ns != name);
        Ok(serde_json::to_value(removed)?)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<Pod>> {
        let mut state = self.state.write().await;
        state.enter("list_pods")?;
        Ok(state
            .pods
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, pod)| pod)
            .filter(|pod| {
                label_selector.map_or(true, |selector| {
                    selector_matches(selector, |key| {
                        pod.metadata.labels.as_ref().and_then(|l| l.get(key).cloned())
                    })
                })
            })
            .filter(|pod| {
                field_selector.map_or(true, |selector| {
                    selector_matches(selector, |field| pod_field(pod, field))
                })
            })
            .cloned()
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let mut state = self.state.write().await;
        state.enter("get_pod")?;
        state
            .pods
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| KubeApiError::not_found("Pod", name))
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let mut state = self.state.write().await;
        state.enter("create_pod")?;
        let name = object_name(&pod.metadata)?;
        let key = (namespace.to_string(), name.clone());
        if state.pods.contains_key(&key) {
            return Err(already_exists("pods", &name));
        }

        let mut created = pod.clone();
        created.metadata.namespace = Some(namespace.to_string());
        state.pods.insert(key, created.clone());
        Ok(created)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<Value> {
        let mut state = self.state.write().await;
        state.enter("delete_pod")?;
        let removed = state
            .pods
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| KubeApiError::not_found("Pod", name))?;
        Ok(serde_json::to_value(removed)?)
    }

    async fn pod_logs(&self, namespace: &str, name: &str) -> Result<String> {
        let mut state = self.state.write().await;
        state.enter("pod_logs")?;
        let key = (namespace.to_string(), name.to_string());
        if !state.pods.contains_key(&key) {
            return Err(KubeApiError::not_found("Pod", name));
        }
        Ok(state.pod_logs.get(&key).cloned().unwrap_or_default())
    }
}

/// [`ClientProvider`] handing out one shared [`MockKubeApi`].
#[derive(Debug, Clone)]
pub struct MockProvider {
    api: MockKubeApi,
    known_contexts: Option<BTreeSet<String>>,
    requested: Arc<RwLock<Vec<Option<String>>>>,
}

impl MockProvider {
    pub fn new(api: MockKubeApi) -> Self {
        Self {
            api,
            known_contexts: None,
            requested: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Reject any named context outside `contexts`.
    pub fn with_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_contexts = Some(contexts.into_iter().map(Into::into).collect());
        self
    }

    pub fn api(&self) -> &MockKubeApi {
        &self.api
    }

    /// Contexts passed to [`ClientProvider::client`], in call order.
    pub async fn requested_contexts(&self) -> Vec<Option<String>> {
        self.requested.read().await.clone()
    }
}

#[async_trait]
impl ClientProvider for MockProvider {
    async fn client(&self, context: Option<&str>) -> Result<Arc<dyn KubeApi>> {
        self.requested
            .write()
            .await
            .push(context.map(str::to_string));

        if let (Some(name), Some(known)) = (context, &self.known_contexts) {
            if !known.contains(name) {
                return Err(KubeApiError::ContextNotFound(name.to_string()));
            }
        }
        Ok(Arc::new(self.api.clone()))
    }
}

#[derive(Debug, Default)]
struct ContextState {
    contexts: Vec<ContextInfo>,
    current: Option<String>,
}

/// In-memory [`ContextStore`].
#[derive(Debug, Clone, Default)]
pub struct MockContextStore {
    state: Arc<RwLock<ContextState>>,
}

impl MockContextStore {
    pub fn new(contexts: Vec<ContextInfo>, current: Option<&str>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ContextState {
                contexts,
                current: current.map(str::to_string),
            })),
        }
    }
}

#[async_trait]
impl ContextStore for MockContextStore {
    async fn list_contexts(&self) -> Result<Vec<ContextInfo>> {
        Ok(self.state.read().await.contexts.clone())
    }

    async fn current_context(&self) -> Result<Option<String>> {
        Ok(self.state.read().await.current.clone())
    }

    async fn add_context(&self, context: ContextInfo) -> Result<()> {
        let mut state = self.state.write().await;
        if state.contexts.iter().any(|c| c.name == context.name) {
            return Err(KubeApiError::ContextExists(context.name));
        }
        state.contexts.push(context);
        Ok(())
    }

    async fn remove_context(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.contexts.len();
        state.contexts.retain(|c| c.name != name);
        if state.contexts.len() == before {
            return Err(KubeApiError::ContextNotFound(name.to_string()));
        }
        if state.current.as_deref() == Some(name) {
            state.current = None;
        }
        Ok(())
    }

    async fn use_context(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.contexts.iter().any(|c| c.name == name) {
            return Err(KubeApiError::ContextNotFound(name.to_string()));
        }
        state.current = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodSpec;
    use kubestellar_shared_types::{BindingPolicySpec, BINDING_POLICY_FALLBACK_VERSION};

    fn pod(name: &str, app: &str, node: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([("app".to_string(), app.to_string())])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some(node.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_check_follows_served_versions() {
        let api = MockKubeApi::new();
        assert!(api.check_binding_policies("v1alpha1").await.is_ok());
        assert!(api
            .check_binding_policies(BINDING_POLICY_FALLBACK_VERSION)
            .await
            .unwrap_err()
            .is_not_found());

        api.serve_versions(&[]).await;
        assert!(api.check_binding_policies("v1alpha1").await.is_err());
    }

    #[tokio::test]
    async fn test_policy_create_then_conflict() {
        let api = MockKubeApi::new();
        let policy = BindingPolicy::new("p1", BindingPolicySpec::default());

        let created = api.create_binding_policy(&policy).await.unwrap();
        assert_eq!(created.metadata.uid.as_deref(), Some("uid-p1"));

        let err = api.create_binding_policy(&policy).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(api.call_count("create_binding_policy").await, 2);
    }

    #[tokio::test]
    async fn test_missing_objects_are_not_found() {
        let api = MockKubeApi::new();
        assert!(api.get_binding_policy("p1").await.unwrap_err().is_not_found());
        assert!(api.delete_binding_policy("p1").await.unwrap_err().is_not_found());
        assert!(api.get_pod("default", "web").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let api = MockKubeApi::new();
        api.fail_operation("list_nodes", 500).await;

        let err = api.list_nodes().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_pod_selectors() {
        let api = MockKubeApi::new();
        api.insert_pod("default", pod("web-1", "web", "node-a"), "").await;
        api.insert_pod("default", pod("db-1", "db", "node-b"), "").await;
        api.insert_pod("other", pod("web-2", "web", "node-a"), "").await;

        let web = api.list_pods("default", Some("app=web"), None).await.unwrap();
        assert_eq!(web.len(), 1);

        let on_b = api
            .list_pods("default", None, Some("spec.nodeName=node-b"))
            .await
            .unwrap();
        assert_eq!(on_b[0].metadata.name.as_deref(), Some("db-1"));

        assert_eq!(api.list_pods("default", None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_provider_checks_known_contexts() {
        let provider = MockProvider::new(MockKubeApi::new()).with_contexts(["wds1"]);

        assert!(provider.client(Some("wds1")).await.is_ok());
        assert!(provider.client(None).await.is_ok());
        assert!(matches!(
            provider.client(Some("wds9")).await.err(),
            Some(KubeApiError::ContextNotFound(_))
        ));
        assert_eq!(
            provider.requested_contexts().await,
            vec![Some("wds1".to_string()), None, Some("wds9".to_string())]
        );
    }

    #[tokio::test]
    async fn test_context_store_switch() {
        let store = MockContextStore::new(
            vec![ContextInfo::new("wds1", "kubeflex", "admin")],
            None,
        );
        store.use_context("wds1").await.unwrap();
        assert_eq!(store.current_context().await.unwrap().as_deref(), Some("wds1"));
        assert!(store.use_context("wds2").await.is_err());
    }
}
