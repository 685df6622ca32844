//! Configuration for the KubeStellar MCP server.
//!
//! Settings live in `~/.config/kubestellar-mcp/config.toml` following XDG
//! standards. A missing file means defaults; command-line flags override
//! individual values after loading.
//!
//! # Example
//!
//! ```no_run
//! use server_config::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> server_config::Result<()> {
//!     let config = ServerConfig::load_default().await?;
//!     println!("default context: {:?}", config.kubernetes.default_context);
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
pub mod paths;

pub use config::{KubernetesSettings, LoggingSettings, ResourceSettings, ServerConfig};
pub use error::{ConfigError, Result};
pub use paths::ConfigPaths;

/// Application name used for XDG paths
pub const APP_NAME: &str = "kubestellar-mcp";
