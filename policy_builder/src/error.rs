//! Error types for BindingPolicy construction.

use thiserror::Error;

/// Result type for builder operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors raised while validating inputs or rendering a policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A required argument is missing or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// A resource configuration entry has no usable type.
    #[error("Invalid resource configuration: {0}")]
    InvalidResourceConfig(String),

    /// The document could not be rendered for display.
    #[error("Failed to render policy: {0}")]
    Render(String),
}

impl PolicyError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<serde_yaml::Error> for PolicyError {
    fn from(err: serde_yaml::Error) -> Self {
        PolicyError::Render(err.to_string())
    }
}
