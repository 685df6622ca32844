//! Kubeconfig-backed context store.
//!
//! Without an explicit path every `KUBECONFIG` entry is read and merged the
//! way kubectl does: the first definition of a context name wins and the
//! first file that sets `current-context` owns it. Edits go back to the file
//! that defines the context; new contexts go to the first file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kube::config::{Context, Kubeconfig, NamedContext};
use tracing::{debug, info};

use kube_api_interface::{ContextInfo, ContextStore, KubeApiError, Result};

/// [`ContextStore`] reading and writing kubeconfig files.
#[derive(Debug, Clone, Default)]
pub struct KubeconfigContexts {
    files: Option<Vec<PathBuf>>,
}

/// One kubeconfig file as read from disk.
struct LoadedFile {
    path: PathBuf,
    kubeconfig: Kubeconfig,
    dirty: bool,
}

/// The kubeconfig files behind the merged view.
struct MergedKubeconfig {
    files: Vec<LoadedFile>,
}

impl MergedKubeconfig {
    /// Index of the file defining `name`.
    fn defining(&self, name: &str) -> Option<usize> {
        self.files
            .iter()
            .position(|f| f.kubeconfig.contexts.iter().any(|c| c.name == name))
    }

    /// Index of the file whose `current-context` is in effect.
    fn current_owner(&self) -> Option<usize> {
        self.files
            .iter()
            .position(|f| f.kubeconfig.current_context.is_some())
    }

    fn current_context(&self) -> Option<String> {
        self.current_owner()
            .and_then(|i| self.files[i].kubeconfig.current_context.clone())
    }

    fn contexts(&self) -> Vec<ContextInfo> {
        let mut seen = Vec::new();
        for file in &self.files {
            for named in &file.kubeconfig.contexts {
                if !seen.iter().any(|c: &ContextInfo| c.name == named.name) {
                    seen.push(to_info(named));
                }
            }
        }
        seen
    }
}

/// Non-empty entries of a `KUBECONFIG`-style path list.
pub fn search_paths(value: &OsString) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

impl KubeconfigContexts {
    /// `None` resolves to every `KUBECONFIG` entry, or `~/.kube/config`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            files: path.map(|p| vec![p]),
        }
    }

    /// Merge the given files in order, like a multi-entry `KUBECONFIG`.
    pub fn with_files(files: Vec<PathBuf>) -> Self {
        Self { files: Some(files) }
    }

    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if let Some(files) = &self.files {
            return Ok(files.clone());
        }
        if let Some(value) = std::env::var_os("KUBECONFIG") {
            let paths = search_paths(&value);
            if !paths.is_empty() {
                return Ok(paths);
            }
        }
        dirs::home_dir()
            .map(|home| vec![home.join(".kube").join("config")])
            .ok_or_else(|| KubeApiError::Config("Could not determine kubeconfig location".into()))
    }

    async fn load(&self) -> Result<MergedKubeconfig> {
        let paths = self.files()?;
        let single = paths.len() == 1;
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                // Missing entries of a merged list are skipped, as kubectl does.
                Err(e) if !single && e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Skipping missing kubeconfig");
                    continue;
                }
                Err(e) => {
                    return Err(KubeApiError::Config(format!(
                        "reading {}: {}",
                        path.display(),
                        e
                    )))
                }
            };
            let kubeconfig = Kubeconfig::from_yaml(&text)
                .map_err(|e| KubeApiError::Config(format!("{}: {}", path.display(), e)))?;
            files.push(LoadedFile {
                path,
                kubeconfig,
                dirty: false,
            });
        }

        if files.is_empty() {
            return Err(KubeApiError::Config("No kubeconfig file found".into()));
        }
        Ok(MergedKubeconfig { files })
    }

    async fn save(&self, merged: &MergedKubeconfig) -> Result<()> {
        for file in merged.files.iter().filter(|f| f.dirty) {
            write_kubeconfig(&file.path, &file.kubeconfig).await?;
        }
        Ok(())
    }
}

async fn write_kubeconfig(path: &Path, kubeconfig: &Kubeconfig) -> Result<()> {
    let text = serde_yaml::to_string(kubeconfig)
        .map_err(|e| KubeApiError::Serialization(e.to_string()))?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| KubeApiError::Config(format!("writing {}: {}", path.display(), e)))
}

fn to_info(named: &NamedContext) -> ContextInfo {
    match &named.context {
        Some(context) => ContextInfo {
            name: named.name.clone(),
            cluster: context.cluster.clone(),
            user: context.user.clone(),
            namespace: context.namespace.clone(),
        },
        None => ContextInfo::new(&named.name, "", ""),
    }
}

#[async_trait]
impl ContextStore for KubeconfigContexts {
    async fn list_contexts(&self) -> Result<Vec<ContextInfo>> {
        Ok(self.load().await?.contexts())
    }

    async fn current_context(&self) -> Result<Option<String>> {
        Ok(self.load().await?.current_context())
    }

    async fn add_context(&self, context: ContextInfo) -> Result<()> {
        let mut merged = self.load().await?;
        if merged.defining(&context.name).is_some() {
            return Err(KubeApiError::ContextExists(context.name));
        }

        let target = &mut merged.files[0];
        target.kubeconfig.contexts.push(NamedContext {
            name: context.name.clone(),
            context: Some(Context {
                cluster: context.cluster,
                user: context.user,
                namespace: context.namespace,
                extensions: None,
            }),
        });
        target.dirty = true;
        let path = target.path.clone();

        self.save(&merged).await?;
        info!(context = %context.name, path = %path.display(), "Added kubeconfig context");
        Ok(())
    }

    async fn remove_context(&self, name: &str) -> Result<()> {
        let mut merged = self.load().await?;
        let index = merged
            .defining(name)
            .ok_or_else(|| KubeApiError::ContextNotFound(name.to_string()))?;

        let file = &mut merged.files[index];
        file.kubeconfig.contexts.retain(|c| c.name != name);
        file.dirty = true;
        let path = file.path.clone();

        if let Some(owner) = merged.current_owner() {
            let owner = &mut merged.files[owner];
            if owner.kubeconfig.current_context.as_deref() == Some(name) {
                owner.kubeconfig.current_context = None;
                owner.dirty = true;
            }
        }

        self.save(&merged).await?;
        info!(context = name, path = %path.display(), "Removed kubeconfig context");
        Ok(())
    }

    async fn use_context(&self, name: &str) -> Result<()> {
        let mut merged = self.load().await?;
        if merged.defining(name).is_none() {
            return Err(KubeApiError::ContextNotFound(name.to_string()));
        }

        let owner = merged.current_owner().unwrap_or(0);
        let file = &mut merged.files[owner];
        file.kubeconfig.current_context = Some(name.to_string());
        file.dirty = true;

        self.save(&merged).await?;
        info!(context = name, "Switched current context");
        Ok(())
    }
}
