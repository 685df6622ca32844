//! Server configuration loaded from TOML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use policy_builder::{StaticCatalog, DEFAULT_BUILTIN_RESOURCES};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::paths::ConfigPaths;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub kubernetes: KubernetesSettings,

    #[serde(default)]
    pub resources: ResourceSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How Kubernetes clients are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubernetesSettings {
    /// Explicit kubeconfig; unset means `KUBECONFIG` or `~/.kube/config`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Context used when a tool call names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_context: Option<String>,

    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

impl Default for KubernetesSettings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            default_context: None,
            insecure_skip_tls_verify: false,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl KubernetesSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Resource classification used when building policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Kinds that need no API group.
    #[serde(default = "default_builtins")]
    pub builtin: Vec<String>,

    /// Default API group per custom resource type.
    #[serde(default)]
    pub api_groups: BTreeMap<String, String>,
}

fn default_builtins() -> Vec<String> {
    DEFAULT_BUILTIN_RESOURCES
        .iter()
        .map(|r| r.to_string())
        .collect()
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            builtin: default_builtins(),
            api_groups: BTreeMap::new(),
        }
    }
}

impl ResourceSettings {
    pub fn catalog(&self) -> StaticCatalog {
        StaticCatalog::new(self.builtin.iter().cloned()).with_api_groups(self.api_groups.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Load from the default XDG location, falling back to defaults.
    pub async fn load_default() -> Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_or_default(&paths.config_file()).await
    }

    /// Load `path`; a missing file yields the defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    /// Load and validate `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded server configuration");
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, toml::to_string_pretty(self)?).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.resources.builtin.is_empty() {
            return Err(ConfigError::validation(
                "resources.builtin must list at least one resource",
            ));
        }
        if self.kubernetes.connect_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "kubernetes.connect_timeout_secs must be greater than zero",
            ));
        }
        if self.kubernetes.read_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "kubernetes.read_timeout_secs must be greater than zero",
            ));
        }
        if tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::validation(format!(
                "logging.level '{}' is not a valid level",
                self.logging.level
            )));
        }
        Ok(())
    }
}
