//! Tracing configuration and initialization.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name reported in the startup event
    pub service_name: String,
    /// Level used when `RUST_LOG` is unset
    pub log_level: Level,
    /// One JSON object per line instead of human-readable output
    pub json_output: bool,
    /// Include target (module path)
    pub include_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "kubestellar-mcp".to_string(),
            log_level: Level::INFO,
            json_output: false,
            include_target: true,
        }
    }
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Set the level from a name such as "debug"; unknown names keep the current level.
    pub fn with_level_name(mut self, level: &str) -> Self {
        if let Ok(level) = Level::from_str(level) {
            self.log_level = level;
        }
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.to_string()))
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Fails if a subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use observability::{init_tracing, TracingConfig};
///
/// init_tracing(TracingConfig::new("kubestellar-mcp").with_level_name("debug")).ok();
/// ```
pub fn init_tracing(config: TracingConfig) -> Result<(), TryInitError> {
    let filter = config.build_filter();

    if config.json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_output,
        "Tracing initialized"
    );
    Ok(())
}

/// Span wrapping one tool invocation.
#[macro_export]
macro_rules! tool_span {
    ($tool:expr) => {
        tracing::info_span!("tool_call", tool = %$tool, context = tracing::field::Empty)
    };
    ($tool:expr, $context:expr) => {
        tracing::info_span!("tool_call", tool = %$tool, context = ?$context)
    };
}

/// Span wrapping one resource read.
#[macro_export]
macro_rules! resource_span {
    ($uri:expr) => {
        tracing::info_span!("resource_read", uri = %$uri)
    };
}
