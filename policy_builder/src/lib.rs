//! BindingPolicy construction.
//!
//! Turns cluster labels, workload labels and a list of resource
//! configurations into a KubeStellar `BindingPolicy` document. The builder is
//! pure: it performs no I/O, and classification of resource types goes
//! through the [`ResourceCatalog`] capability so new kinds can be configured
//! rather than compiled in.
//!
//! # Example
//!
//! ```
//! use policy_builder::{BindingPolicyBuilder, PolicyRequest, StaticCatalog};
//! use kubestellar_shared_types::ResourceConfig;
//!
//! let catalog = StaticCatalog::default();
//! let mut request = PolicyRequest::new("nginx-bpolicy");
//! request.resource_configs = vec![ResourceConfig::new("namespaces"), ResourceConfig::new("pods")];
//!
//! let policy = BindingPolicyBuilder::new(&catalog).build(&request).unwrap();
//! assert_eq!(policy.spec.downsync[0].resources, vec!["namespaces"]);
//! ```

pub mod builder;
pub mod catalog;
mod error;
pub mod summary;

pub use builder::{BindingPolicyBuilder, PolicyRequest};
pub use catalog::{ResourceCatalog, StaticCatalog, DEFAULT_BUILTIN_RESOURCES};
pub use error::{PolicyError, Result};
pub use summary::{format_labels, parse_yaml, render_yaml, PolicySummary};
