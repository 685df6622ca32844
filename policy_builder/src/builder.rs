//! Downsync rule assembly.
//!
//! Rules come out in a fixed order: the namespaces rule (if requested),
//! then one rule per custom resource, then one per remaining built-in kind.
//! Custom and built-in rules each keep the caller's encounter order.

use std::collections::BTreeMap;

use kubestellar_shared_types::{
    BindingPolicy, BindingPolicySpec, DownsyncRule, LabelSelectorTerm, ResourceConfig,
    BINDING_MODE_DOWNSYNC, NAMESPACES_RESOURCE,
};
use tracing::debug;

use crate::catalog::ResourceCatalog;
use crate::error::{PolicyError, Result};

/// Everything needed to construct one BindingPolicy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRequest {
    pub name: String,
    pub cluster_labels: BTreeMap<String, String>,
    pub workload_labels: BTreeMap<String, String>,
    pub resource_configs: Vec<ResourceConfig>,
    pub namespaces_to_sync: Option<Vec<String>>,
}

impl PolicyRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check the request before any document is built.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PolicyError::invalid_input("Policy name cannot be empty"));
        }

        for config in &self.resource_configs {
            if config.resource_type.trim().is_empty() {
                let entry = serde_json::to_string(config)
                    .unwrap_or_else(|_| format!("{:?}", config));
                return Err(PolicyError::InvalidResourceConfig(entry));
            }
        }

        Ok(())
    }

    /// Namespace restriction to copy into rules; an empty list means none.
    fn sync_namespaces(&self) -> Option<Vec<String>> {
        self.namespaces_to_sync
            .as_ref()
            .filter(|namespaces| !namespaces.is_empty())
            .cloned()
    }
}

/// Builds BindingPolicy documents using an injected resource catalog.
pub struct BindingPolicyBuilder<'a> {
    catalog: &'a dyn ResourceCatalog,
}

impl<'a> BindingPolicyBuilder<'a> {
    pub fn new(catalog: &'a dyn ResourceCatalog) -> Self {
        Self { catalog }
    }

    /// Validate `request` and assemble the policy document.
    pub fn build(&self, request: &PolicyRequest) -> Result<BindingPolicy> {
        request.validate()?;

        let downsync = self.downsync_rules(request);
        debug!(
            policy = %request.name,
            rules = downsync.len(),
            "Assembled downsync rules"
        );

        let spec = BindingPolicySpec {
            downsync,
            cluster_selectors: vec![LabelSelectorTerm::new(request.cluster_labels.clone())],
            binding_mode: BINDING_MODE_DOWNSYNC.to_string(),
            want_singleton_reported_state: false,
            extra: Default::default(),
        };

        Ok(BindingPolicy::new(&request.name, spec))
    }

    fn downsync_rules(&self, request: &PolicyRequest) -> Vec<DownsyncRule> {
        let namespaces = request.sync_namespaces();
        let selectors = vec![LabelSelectorTerm::new(request.workload_labels.clone())];

        let mut wants_namespaces = false;
        let mut custom = Vec::new();
        let mut builtin = Vec::new();

        for config in &request.resource_configs {
            if config.is_namespaces() {
                wants_namespaces = true;
                continue;
            }

            let api_group = if self.catalog.is_builtin(&config.resource_type) {
                None
            } else {
                Some(
                    self.catalog
                        .api_group(&config.resource_type)
                        .unwrap_or_default(),
                )
            };

            let rule = DownsyncRule {
                resources: vec![config.resource_type.clone()],
                object_selectors: selectors.clone(),
                api_group,
                create_only: config.create_only,
                namespaces: namespaces.clone(),
                extra: Default::default(),
            };

            if rule.api_group.is_some() {
                custom.push(rule);
            } else {
                builtin.push(rule);
            }
        }

        let mut rules = Vec::with_capacity(custom.len() + builtin.len() + 1);
        if wants_namespaces {
            rules.push(DownsyncRule {
                resources: vec![NAMESPACES_RESOURCE.to_string()],
                object_selectors: selectors.clone(),
                api_group: None,
                create_only: false,
                namespaces: namespaces.clone(),
                extra: Default::default(),
            });
        }
        rules.extend(custom);
        rules.extend(builtin);
        rules
    }
}
