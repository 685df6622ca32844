//! Per-context client construction from a kubeconfig.
//!
//! Each call builds its own [`Config`], so TLS and timeout settings never
//! leak between contexts or calls.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use kube_api_interface::{ClientProvider, KubeApi, KubeApiError, Result};

use crate::kube_rs_api::KubeRsApi;

/// How clients are built for each request.
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Explicit kubeconfig path; falls back to `KUBECONFIG` / `~/.kube/config`.
    pub kubeconfig: Option<PathBuf>,
    /// Context used when a call names none.
    pub default_context: Option<String>,
    pub insecure_skip_tls_verify: bool,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
}

/// [`ClientProvider`] that reads the kubeconfig on every resolution.
#[derive(Debug, Clone)]
pub struct KubeconfigProvider {
    settings: ClientSettings,
}

impl KubeconfigProvider {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn load_kubeconfig(&self) -> Result<Kubeconfig> {
        match &self.settings.kubeconfig {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    KubeApiError::Config(format!("reading {}: {}", path.display(), e))
                })?;
                Kubeconfig::from_yaml(&text).map_err(|e| KubeApiError::Config(e.to_string()))
            }
            None => Kubeconfig::read().map_err(|e| KubeApiError::Config(e.to_string())),
        }
    }

    /// Client configuration for `context`, or the default when `None`.
    pub async fn config_for(&self, context: Option<&str>) -> Result<Config> {
        let kubeconfig = self.load_kubeconfig().await?;
        let context = context
            .map(str::to_string)
            .or_else(|| self.settings.default_context.clone());

        if let Some(name) = &context {
            if !kubeconfig.contexts.iter().any(|c| &c.name == name) {
                return Err(KubeApiError::ContextNotFound(name.clone()));
            }
        }

        let options = KubeConfigOptions {
            context: context.clone(),
            ..Default::default()
        };
        let mut config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| KubeApiError::Config(e.to_string()))?;

        config.accept_invalid_certs = self.settings.insecure_skip_tls_verify;
        if let Some(timeout) = self.settings.connect_timeout {
            config.connect_timeout = Some(timeout);
        }
        if let Some(timeout) = self.settings.read_timeout {
            config.read_timeout = Some(timeout);
        }

        debug!(
            context = context.as_deref().unwrap_or("<current>"),
            cluster = %config.cluster_url,
            insecure = config.accept_invalid_certs,
            "Resolved client configuration"
        );
        Ok(config)
    }
}

#[async_trait]
impl ClientProvider for KubeconfigProvider {
    async fn client(&self, context: Option<&str>) -> Result<Arc<dyn KubeApi>> {
        let config = self.config_for(context).await?;
        let client = Client::try_from(config).map_err(|e| KubeApiError::Transport(e.to_string()))?;
        Ok(Arc::new(KubeRsApi::new(client)))
    }
}
