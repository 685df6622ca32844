//! MCP Server binary for KubeStellar.
//!
//! # Usage
//!
//! Run with stdio transport:
//! ```bash
//! kubestellar-mcp --context wds1
//! ```

use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use tracing::{error, info};

use kube_api::{ClientSettings, KubeconfigContexts, KubeconfigProvider};
use mcp_server::server::ToolDefinitions;
use mcp_server::KubestellarMcpServer;
use observability::{init_tracing, TracingConfig};
use server_config::{ServerConfig, APP_NAME};

#[derive(Debug, Parser)]
#[command(name = "kubestellar-mcp", version, about = "MCP server for KubeStellar")]
struct Cli {
    /// Configuration file (defaults to the XDG config location)
    #[arg(long, env = "KUBESTELLAR_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Kubeconfig to use instead of KUBECONFIG or ~/.kube/config
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Context used when a tool call names none
    #[arg(long)]
    context: Option<String>,

    /// Skip TLS verification of API servers
    #[arg(long)]
    insecure_skip_tls_verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "KUBESTELLAR_MCP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the tool names and exit
    #[arg(long)]
    list_tools: bool,
}

/// Main entry point for the MCP server.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.list_tools {
        for tool in ToolDefinitions::all().tools {
            println!("{}", tool.name);
        }
        return;
    }

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            exit(1);
        }
    };

    // stdout is reserved for the MCP protocol; logs go to stderr
    let tracing_config = TracingConfig::new(APP_NAME)
        .with_level_name(&config.logging.level)
        .with_json(config.logging.json);
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting KubeStellar MCP server...");

    if let Err(e) = run_server(config).await {
        error!("Server error: {}", e);
        exit(1);
    }
}

async fn load_config(cli: &Cli) -> server_config::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path).await?,
        None => ServerConfig::load_default().await?,
    };

    if let Some(kubeconfig) = &cli.kubeconfig {
        config.kubernetes.kubeconfig = Some(kubeconfig.clone());
    }
    if let Some(context) = &cli.context {
        config.kubernetes.default_context = Some(context.clone());
    }
    if cli.insecure_skip_tls_verify {
        config.kubernetes.insecure_skip_tls_verify = true;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = ClientSettings {
        kubeconfig: config.kubernetes.kubeconfig.clone(),
        default_context: config.kubernetes.default_context.clone(),
        insecure_skip_tls_verify: config.kubernetes.insecure_skip_tls_verify,
        connect_timeout: Some(config.kubernetes.connect_timeout()),
        read_timeout: Some(config.kubernetes.read_timeout()),
    };
    if settings.insecure_skip_tls_verify {
        info!("TLS verification of API servers is disabled");
    }

    let provider = KubeconfigProvider::new(settings);
    let contexts = KubeconfigContexts::new(config.kubernetes.kubeconfig.clone());
    let catalog = config.resources.catalog();

    let server = KubestellarMcpServer::new(provider, contexts, catalog);
    info!(
        "Server info: {} v{}",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );

    server.serve_stdio().await
}
