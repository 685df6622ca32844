//! Kubernetes access for the KubeStellar tool server.
//!
//! - [`KubeRsApi`] talks to a real API server through kube-rs.
//! - [`KubeconfigProvider`] builds one client per kubeconfig context.
//! - [`KubeconfigContexts`] lists and edits kubeconfig contexts.
//! - [`mock`] holds in-memory fakes for tests.

mod kube_rs_api;
mod kubeconfig_store;
pub mod mock;
mod provider;

pub use kube_rs_api::KubeRsApi;
pub use kubeconfig_store::KubeconfigContexts;
pub use provider::{ClientSettings, KubeconfigProvider};
