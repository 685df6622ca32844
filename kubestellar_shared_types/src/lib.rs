//! Shared types for the KubeStellar MCP server.
//!
//! Holds the cluster-scoped `BindingPolicy` custom resource served under
//! `control.kubestellar.io`, its downsync rules and status, and the resource
//! configuration entries that tools accept from callers.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BINDING_POLICY_GROUP: &str = "control.kubestellar.io";
pub const BINDING_POLICY_VERSION: &str = "v1alpha1";
/// Only tried when `v1alpha1` is not served; documents are always written as `v1alpha1`.
pub const BINDING_POLICY_FALLBACK_VERSION: &str = "v1alpha2";
pub const BINDING_POLICY_KIND: &str = "BindingPolicy";
pub const BINDING_POLICY_PLURAL: &str = "bindingpolicies";

pub const BINDING_MODE_DOWNSYNC: &str = "Downsync";

/// Resource type that is always hoisted into a single leading downsync rule.
pub const NAMESPACES_RESOURCE: &str = "namespaces";

/// Spec of a KubeStellar `BindingPolicy`.
///
/// The resource is cluster-scoped, so generated `BindingPolicy` objects never
/// carry `metadata.namespace`.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "control.kubestellar.io",
    version = "v1alpha1",
    kind = "BindingPolicy",
    plural = "bindingpolicies",
    status = "BindingPolicyStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct BindingPolicySpec {
    /// Ordered downsync rules
    #[serde(default)]
    pub downsync: Vec<DownsyncRule>,
    /// Selectors picking the target clusters
    #[serde(default)]
    pub cluster_selectors: Vec<LabelSelectorTerm>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub binding_mode: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub want_singleton_reported_state: bool,
    /// Served spec fields this crate does not model; kept for read-back.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A Kubernetes label selector.
///
/// Generated selectors only use `matchLabels`; served ones may also carry
/// `matchExpressions` and are read back unchanged apart from an explicit
/// empty `matchLabels`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorTerm {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LabelSelectorTerm {
    pub fn new(match_labels: BTreeMap<String, String>) -> Self {
        Self {
            match_labels,
            ..Default::default()
        }
    }
}

/// One `matchExpressions` entry, e.g. `location-group In [edge]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// One downsync clause: which resource kinds, selected by which labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownsyncRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_selectors: Vec<LabelSelectorTerm>,
    /// Set only for custom resources; built-in kinds have no group qualifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    /// e.g. `namespaceSelectors`, `objectNames`, `statusCollectors`
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Status reported by the KubeStellar controllers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BindingPolicyStatus {
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BindingPolicyStatus {
    /// Status of the first reported condition, or an empty string.
    pub fn summary(&self) -> &str {
        self.conditions
            .first()
            .map(|c| c.status.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCondition {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// e.g. `lastUpdateTime`
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One kind of workload resource a caller wants synchronized.
///
/// Accepts both the `Type`/`CreateOnly` spelling used by tool callers and
/// the camel-case `type`/`createOnly` spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceConfig {
    /// Plural resource type, e.g. "pods" or "widgets"
    #[serde(rename = "Type", alias = "type")]
    pub resource_type: String,
    /// Create the object on target clusters but never update it afterwards.
    /// Any truthy value counts: non-zero numbers, non-empty strings, arrays
    /// and objects.
    #[serde(
        rename = "CreateOnly",
        alias = "createOnly",
        default,
        deserialize_with = "truthy"
    )]
    pub create_only: bool,
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}

impl ResourceConfig {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            create_only: false,
        }
    }

    pub fn create_only(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            create_only: true,
        }
    }

    pub fn is_namespaces(&self) -> bool {
        self.resource_type == NAMESPACES_RESOURCE
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_rule_omits_optional_fields() {
        let rule = DownsyncRule {
            resources: vec!["pods".to_string()],
            object_selectors: vec![LabelSelectorTerm::new(BTreeMap::from([(
                "app".to_string(),
                "x".to_string(),
            )]))],
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"resources": ["pods"], "objectSelectors": [{"matchLabels": {"app": "x"}}]})
        );
    }

    #[test]
    fn test_custom_rule_keeps_empty_api_group() {
        let rule = DownsyncRule {
            resources: vec!["widgets".to_string()],
            api_group: Some(String::new()),
            create_only: true,
            ..Default::default()
        };

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["apiGroup"], "");
        assert_eq!(value["createOnly"], true);
        assert!(value.get("namespaces").is_none());
    }

    #[test]
    fn test_policy_document_shape() {
        let policy = BindingPolicy::new(
            "p1",
            BindingPolicySpec {
                binding_mode: BINDING_MODE_DOWNSYNC.to_string(),
                ..Default::default()
            },
        );

        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value["apiVersion"], "control.kubestellar.io/v1alpha1");
        assert_eq!(value["kind"], "BindingPolicy");
        assert_eq!(value["metadata"], json!({"name": "p1"}));
        assert_eq!(value["spec"]["bindingMode"], "Downsync");
        assert!(value.get("status").is_none());
    }

    #[test]
    fn test_deserialize_served_policy() {
        let served = json!({
            "apiVersion": "control.kubestellar.io/v1alpha1",
            "kind": "BindingPolicy",
            "metadata": {
                "name": "nginx-bpolicy",
                "uid": "0d3c1e6c-5bfb-4c43-9a0c-4d3b2b9a1f11",
                "creationTimestamp": "2024-05-01T10:00:00Z"
            },
            "spec": {
                "clusterSelectors": [{"matchLabels": {"location-group": "edge"}}],
                "downsync": [{
                    "objectSelectors": [{"matchLabels": {"app.kubernetes.io/name": "nginx"}}],
                    "statusCollectors": ["replicas"]
                }],
                "wantSingletonReportedState": true
            },
            "status": {
                "conditions": [{"type": "Ready", "status": "True"}],
                "observedGeneration": 3
            }
        });

        let policy: BindingPolicy = serde_json::from_value(served).unwrap();
        assert_eq!(policy.spec.downsync.len(), 1);
        assert!(policy.spec.downsync[0].resources.is_empty());
        assert!(policy.spec.want_singleton_reported_state);
        assert!(policy.spec.binding_mode.is_empty());

        let status = policy.status.unwrap();
        assert_eq!(status.summary(), "True");
        assert_eq!(status.observed_generation, 3);
        assert!(status.errors.is_empty());
    }

    #[test]
    fn test_resource_config_accepts_both_spellings() {
        let upper: ResourceConfig =
            serde_json::from_value(json!({"Type": "widgets", "CreateOnly": true})).unwrap();
        let lower: ResourceConfig =
            serde_json::from_value(json!({"type": "widgets", "createOnly": true})).unwrap();

        assert_eq!(upper, lower);
        assert_eq!(upper, ResourceConfig::create_only("widgets"));
    }

    #[test]
    fn test_resource_config_create_only_is_truthy() {
        let create_only = |value: Value| {
            serde_json::from_value::<ResourceConfig>(json!({"Type": "pods", "CreateOnly": value}))
                .unwrap()
                .create_only
        };

        assert!(create_only(json!("yes")));
        assert!(create_only(json!(1)));
        assert!(create_only(json!(["x"])));
        assert!(!create_only(json!("")));
        assert!(!create_only(json!(0)));
        assert!(!create_only(Value::Null));
        assert!(!create_only(json!({})));
    }

    #[test]
    fn test_resource_config_requires_type() {
        let result = serde_json::from_value::<ResourceConfig>(json!({"CreateOnly": true}));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_status_summary() {
        assert_eq!(BindingPolicyStatus::default().summary(), "");
    }
}
