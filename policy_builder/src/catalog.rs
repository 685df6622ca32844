//! Resource classification.
//!
//! Decides whether a resource type is a Kubernetes built-in (no API group
//! qualifier) or a custom resource, and which API group a custom resource
//! lives in.

use std::collections::{BTreeMap, BTreeSet};

/// Built-in kinds recognised when no other set is configured.
pub const DEFAULT_BUILTIN_RESOURCES: [&str; 6] = [
    "pods",
    "deployments",
    "services",
    "namespaces",
    "configmaps",
    "secrets",
];

/// Lookup capability used by the builder to classify resource types.
pub trait ResourceCatalog: Send + Sync {
    /// Whether `resource` is a built-in kind that needs no API group.
    fn is_builtin(&self, resource: &str) -> bool;

    /// API group of a custom resource, if known.
    fn api_group(&self, resource: &str) -> Option<String>;
}

/// Catalog backed by a fixed built-in set and a group lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCatalog {
    builtins: BTreeSet<String>,
    api_groups: BTreeMap<String, String>,
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_BUILTIN_RESOURCES)
    }
}

impl StaticCatalog {
    /// Create a catalog with the given built-in kinds and no group mappings.
    pub fn new<I, S>(builtins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            builtins: builtins.into_iter().map(Into::into).collect(),
            api_groups: BTreeMap::new(),
        }
    }

    /// Add group mappings, replacing existing entries for the same type.
    pub fn with_api_groups(mut self, groups: BTreeMap<String, String>) -> Self {
        self.api_groups.extend(groups);
        self
    }

    /// Copy of this catalog with per-call group mappings layered on top.
    pub fn overlay(&self, groups: &BTreeMap<String, String>) -> Self {
        self.clone().with_api_groups(groups.clone())
    }

    pub fn builtins(&self) -> impl Iterator<Item = &str> {
        self.builtins.iter().map(String::as_str)
    }
}

impl ResourceCatalog for StaticCatalog {
    fn is_builtin(&self, resource: &str) -> bool {
        self.builtins.contains(resource)
    }

    fn api_group(&self, resource: &str) -> Option<String> {
        self.api_groups.get(resource).cloned()
    }
}
