//! Human-facing summary of a freshly built policy.

use std::collections::BTreeMap;

use kubestellar_shared_types::BindingPolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::builder::PolicyRequest;
use crate::error::Result;

/// Status reported for a policy the controllers have not picked up yet.
pub const INITIAL_POLICY_STATUS: &str = "inactive";

/// Summary returned to callers after a policy is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub name: String,
    pub status: String,
    pub binding_mode: String,
    /// Cluster selector labels formatted as "key: value"
    pub clusters: Vec<String>,
    /// Requested resource types, in request order
    pub workloads: Vec<String>,
    pub clusters_count: usize,
    pub workloads_count: usize,
    /// The submitted document rendered as YAML
    pub yaml: String,
}

impl PolicySummary {
    pub fn new(policy: &BindingPolicy, request: &PolicyRequest) -> Result<Self> {
        Ok(Self {
            name: request.name.clone(),
            status: INITIAL_POLICY_STATUS.to_string(),
            binding_mode: policy.spec.binding_mode.clone(),
            clusters: format_labels(&request.cluster_labels),
            workloads: request
                .resource_configs
                .iter()
                .map(|c| c.resource_type.clone())
                .collect(),
            clusters_count: request.cluster_labels.len(),
            workloads_count: request.resource_configs.len(),
            yaml: render_yaml(policy)?,
        })
    }
}

/// Render labels as "key: value" strings.
pub fn format_labels(labels: &BTreeMap<String, String>) -> Vec<String> {
    labels.iter().map(|(k, v)| format!("{}: {}", k, v)).collect()
}

pub fn render_yaml(policy: &BindingPolicy) -> Result<String> {
    Ok(serde_yaml::to_string(policy)?)
}

pub fn parse_yaml(text: &str) -> Result<BindingPolicy> {
    Ok(serde_yaml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BindingPolicyBuilder;
    use crate::catalog::StaticCatalog;
    use kubestellar_shared_types::ResourceConfig;

    fn sample_request() -> PolicyRequest {
        PolicyRequest {
            name: "edge-nginx".to_string(),
            cluster_labels: BTreeMap::from([
                ("location-group".to_string(), "edge".to_string()),
                ("tier".to_string(), "prod".to_string()),
            ]),
            workload_labels: BTreeMap::from([("app".to_string(), "nginx".to_string())]),
            resource_configs: vec![
                ResourceConfig::new("deployments"),
                ResourceConfig::create_only("widgets"),
                ResourceConfig::new("namespaces"),
            ],
            namespaces_to_sync: Some(vec!["nginx".to_string()]),
        }
    }

    #[test]
    fn test_summary_counts_and_labels() {
        let catalog = StaticCatalog::default();
        let request = sample_request();
        let policy = BindingPolicyBuilder::new(&catalog).build(&request).unwrap();

        let summary = PolicySummary::new(&policy, &request).unwrap();
        assert_eq!(summary.status, "inactive");
        assert_eq!(summary.binding_mode, "Downsync");
        assert_eq!(summary.clusters, vec!["location-group: edge", "tier: prod"]);
        assert_eq!(summary.workloads, vec!["deployments", "widgets", "namespaces"]);
        assert_eq!(summary.clusters_count, 2);
        assert_eq!(summary.workloads_count, 3);
        assert!(summary.yaml.contains("kind: BindingPolicy"));
    }

    #[test]
    fn test_yaml_round_trip_preserves_rules() {
        let catalog = StaticCatalog::default()
            .with_api_groups(BTreeMap::from([("widgets".to_string(), "example.io".to_string())]));
        let policy = BindingPolicyBuilder::new(&catalog)
            .build(&sample_request())
            .unwrap();

        let parsed = parse_yaml(&render_yaml(&policy).unwrap()).unwrap();
        assert_eq!(parsed.spec.downsync, policy.spec.downsync);
        assert_eq!(parsed.spec.cluster_selectors, policy.spec.cluster_selectors);
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_yaml_omits_namespace() {
        let catalog = StaticCatalog::default();
        let policy = BindingPolicyBuilder::new(&catalog)
            .build(&sample_request())
            .unwrap();

        let yaml = render_yaml(&policy).unwrap();
        assert!(yaml.contains("name: edge-nginx"));
        assert!(!yaml.contains("namespace: "));
    }
}
