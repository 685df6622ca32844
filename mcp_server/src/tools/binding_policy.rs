//! BindingPolicy MCP tools.
//!
//! These tools create, list, inspect and delete KubeStellar binding policies.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use kube_api_interface::KubeApi;
use kubestellar_shared_types::{
    BindingPolicy, DownsyncRule, LabelSelectorTerm, PolicyCondition, ResourceConfig,
    BINDING_POLICY_FALLBACK_VERSION, BINDING_POLICY_VERSION,
};
use policy_builder::{BindingPolicyBuilder, PolicyRequest, PolicySummary, StaticCatalog};

use super::context_arg;
use crate::error::{ToolError, ToolResult};

// ===== Inputs =====

/// Input for creating a binding policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CreateBindingPolicyInput {
    /// Name of the binding policy
    pub policy_name: String,
    /// Accepted for compatibility; binding policies are cluster-scoped
    #[serde(default)]
    pub namespace: Option<String>,
    /// Labels selecting the target clusters
    pub cluster_labels: BTreeMap<String, String>,
    /// Labels selecting the workload objects to sync
    pub workload_labels: BTreeMap<String, String>,
    /// Resource types to sync, e.g. {"Type": "deployments", "CreateOnly": false}
    pub resource_configs: Vec<ResourceConfig>,
    /// API group for each custom resource type
    #[serde(default)]
    pub crd_api_groups: BTreeMap<String, String>,
    /// Restrict every rule to these namespaces
    #[serde(default)]
    pub namespaces_to_sync: Option<Vec<String>>,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

impl CreateBindingPolicyInput {
    /// Decode raw arguments, checking their shape field by field first.
    pub fn from_arguments(args: Value) -> ToolResult<Self> {
        {
            let empty = Map::new();
            let fields = args.as_object().unwrap_or(&empty);

            let name = fields
                .get("policy_name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if name.trim().is_empty() {
                return Err(ToolError::invalid_input("Policy name cannot be empty"));
            }
            if !is_string_map(fields.get("cluster_labels")) {
                return Err(ToolError::invalid_input("cluster_labels must be a dictionary"));
            }
            if !is_string_map(fields.get("workload_labels")) {
                return Err(ToolError::invalid_input("workload_labels must be a dictionary"));
            }

            let configs = fields
                .get("resource_configs")
                .and_then(Value::as_array)
                .ok_or_else(|| ToolError::invalid_input("resource_configs must be a list"))?;
            for entry in configs {
                if serde_json::from_value::<ResourceConfig>(entry.clone()).is_err() {
                    return Err(ToolError::InvalidResourceConfig(entry.to_string()));
                }
            }
        }

        super::parse_args(args)
    }

    pub fn to_request(&self) -> PolicyRequest {
        PolicyRequest {
            name: self.policy_name.clone(),
            cluster_labels: self.cluster_labels.clone(),
            workload_labels: self.workload_labels.clone(),
            resource_configs: self.resource_configs.clone(),
            namespaces_to_sync: self.namespaces_to_sync.clone(),
        }
    }
}

fn is_string_map(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_object)
        .map_or(false, |map| map.values().all(Value::is_string))
}

/// Input for tools addressing one binding policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PolicyNameInput {
    /// Name of the binding policy
    pub policy_name: String,
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

context_arg!(CreateBindingPolicyInput, PolicyNameInput);

// ===== Outputs =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBindingPolicyOutput {
    pub message: String,
    pub binding_policy: PolicySummary,
}

/// One row of the policy listing
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListing {
    pub name: String,
    /// Creation timestamp
    pub age: String,
    /// Status of the first reported condition, or empty
    pub status: String,
    pub cluster_selectors: Vec<LabelSelectorTerm>,
    pub downsync: Vec<DownsyncRule>,
    pub binding_mode: String,
}

impl From<&BindingPolicy> for PolicyListing {
    fn from(policy: &BindingPolicy) -> Self {
        Self {
            name: policy.metadata.name.clone().unwrap_or_default(),
            age: creation_timestamp(&policy.metadata),
            status: policy
                .status
                .as_ref()
                .map(|s| s.summary().to_string())
                .unwrap_or_default(),
            cluster_selectors: policy.spec.cluster_selectors.clone(),
            downsync: policy.spec.downsync.clone(),
            binding_mode: policy.spec.binding_mode.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListBindingPoliciesOutput {
    pub message: String,
    pub binding_policies: Vec<PolicyListing>,
    pub total_policies: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeletedPolicy {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBindingPolicyOutput {
    pub message: String,
    /// Absent when the policy did not exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_policy: Option<DeletedPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyMetadata {
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: String,
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpecDetails {
    pub binding_mode: String,
    pub cluster_selectors: Vec<LabelSelectorTerm>,
    pub downsync: Vec<DownsyncRule>,
    pub want_singleton_reported_state: bool,
    /// Served spec fields passed through as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatusDetails {
    pub conditions: Vec<PolicyCondition>,
    pub errors: Vec<String>,
    pub observed_generation: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BindingPolicyDetails {
    pub metadata: PolicyMetadata,
    pub spec: PolicySpecDetails,
    pub status: PolicyStatusDetails,
}

impl From<&BindingPolicy> for BindingPolicyDetails {
    fn from(policy: &BindingPolicy) -> Self {
        let status = policy.status.clone().unwrap_or_default();
        Self {
            metadata: PolicyMetadata {
                name: policy.metadata.name.clone().unwrap_or_default(),
                namespace: policy.metadata.namespace.clone().unwrap_or_default(),
                creation_timestamp: creation_timestamp(&policy.metadata),
                uid: policy.metadata.uid.clone().unwrap_or_default(),
            },
            spec: PolicySpecDetails {
                binding_mode: policy.spec.binding_mode.clone(),
                cluster_selectors: policy.spec.cluster_selectors.clone(),
                downsync: policy.spec.downsync.clone(),
                want_singleton_reported_state: policy.spec.want_singleton_reported_state,
                extra: policy.spec.extra.clone(),
            },
            status: PolicyStatusDetails {
                conditions: status.conditions,
                errors: status.errors,
                observed_generation: status.observed_generation,
                extra: status.extra,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetBindingPolicyDetailsOutput {
    pub message: String,
    pub binding_policy: BindingPolicyDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PolicyStatusReport {
    /// The full status block as served
    pub status: Value,
    pub conditions: Vec<PolicyCondition>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetBindingPolicyStatusOutput {
    pub message: String,
    pub binding_policy_status: PolicyStatusReport,
}

fn creation_timestamp(meta: &ObjectMeta) -> String {
    meta.creation_timestamp
        .as_ref()
        .and_then(|t| serde_json::to_value(t).ok())
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

// ===== Handlers =====

/// Fail with [`ToolError::ApiNotAccessible`] unless some BindingPolicy version is served.
async fn ensure_api_served(api: &dyn KubeApi) -> ToolResult<()> {
    match api.check_binding_policies(BINDING_POLICY_VERSION).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_not_found() => {
            debug!(
                version = BINDING_POLICY_FALLBACK_VERSION,
                "Primary BindingPolicy version not served, probing fallback"
            );
            match api.check_binding_policies(BINDING_POLICY_FALLBACK_VERSION).await {
                Ok(()) => Ok(()),
                Err(err) if err.is_not_found() => Err(ToolError::ApiNotAccessible),
                Err(err) => Err(err.into()),
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Build and submit a binding policy.
///
/// Per-call `crd_api_groups` take precedence over the configured groups.
pub async fn create_binding_policy(
    api: &dyn KubeApi,
    catalog: &StaticCatalog,
    input: CreateBindingPolicyInput,
) -> ToolResult<CreateBindingPolicyOutput> {
    let request = input.to_request();
    let catalog = catalog.overlay(&input.crd_api_groups);
    let policy = BindingPolicyBuilder::new(&catalog).build(&request)?;

    ensure_api_served(api).await?;

    match api.get_binding_policy(&request.name).await {
        Ok(_) => return Err(ToolError::PolicyAlreadyExists(request.name)),
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err.into()),
    }

    api.create_binding_policy(&policy).await?;
    info!(
        policy = %request.name,
        rules = policy.spec.downsync.len(),
        "Created binding policy"
    );

    Ok(CreateBindingPolicyOutput {
        message: format!("Created binding policy '{}' successfully", request.name),
        binding_policy: PolicySummary::new(&policy, &request)?,
    })
}

pub async fn list_binding_policies(api: &dyn KubeApi) -> ToolResult<ListBindingPoliciesOutput> {
    let policies = api.list_binding_policies().await?;
    let binding_policies: Vec<PolicyListing> = policies.iter().map(PolicyListing::from).collect();

    Ok(ListBindingPoliciesOutput {
        message: "Successfully retrieved binding policies".to_string(),
        total_policies: binding_policies.len(),
        binding_policies,
    })
}

/// Delete a policy; a missing policy is reported, not treated as a failure.
pub async fn delete_binding_policy(
    api: &dyn KubeApi,
    input: PolicyNameInput,
) -> ToolResult<DeleteBindingPolicyOutput> {
    let name = input.policy_name;
    match api.delete_binding_policy(&name).await {
        Ok(()) => Ok(DeleteBindingPolicyOutput {
            message: format!("Binding policy '{}' deleted successfully", name),
            deleted_policy: Some(DeletedPolicy {
                name,
                status: "deleted".to_string(),
            }),
        }),
        Err(err) if err.is_not_found() => Ok(DeleteBindingPolicyOutput {
            message: format!("Binding policy '{}' not found", name),
            deleted_policy: None,
        }),
        Err(err) => Err(err.into()),
    }
}

pub async fn get_binding_policy_details(
    api: &dyn KubeApi,
    input: PolicyNameInput,
) -> ToolResult<GetBindingPolicyDetailsOutput> {
    let policy = api.get_binding_policy(&input.policy_name).await?;

    Ok(GetBindingPolicyDetailsOutput {
        message: format!(
            "Successfully retrieved details for binding policy '{}'",
            input.policy_name
        ),
        binding_policy: BindingPolicyDetails::from(&policy),
    })
}

pub async fn get_binding_policy_status(
    api: &dyn KubeApi,
    input: PolicyNameInput,
) -> ToolResult<GetBindingPolicyStatusOutput> {
    let policy = api.get_binding_policy(&input.policy_name).await?;
    let status = policy.status.unwrap_or_default();

    Ok(GetBindingPolicyStatusOutput {
        message: format!(
            "Successfully retrieved status for binding policy '{}'",
            input.policy_name
        ),
        binding_policy_status: PolicyStatusReport {
            status: super::encode(&status)?,
            conditions: status.conditions,
            errors: status.errors,
        },
    })
}
