//! Tool failures and their wire form.

use kube_api_interface::KubeApiError;
use policy_builder::PolicyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type returned by every tool handler.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// A tool invocation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid resource configuration: {0}")]
    InvalidResourceConfig(String),

    #[error("Binding policy '{0}' already exists")]
    PolicyAlreadyExists(String),

    #[error("WDS context '{0}' already exists")]
    ContextAlreadyExists(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("BindingPolicy API not accessible")]
    ApiNotAccessible,

    #[error("Kubernetes API error: {status}")]
    Upstream {
        status: u16,
        message: String,
        details: Option<String>,
    },

    #[error("{0}")]
    Unexpected(String),
}

const API_NOT_ACCESSIBLE_GUIDANCE: &str = "The BindingPolicy API endpoint is not accessible. \
     Please verify the API version and permissions.";

const NO_DETAILS: &str = "No details available";

/// `{error, message, details?}` object returned to the caller on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Wire form of this error as reported by `tool`.
    pub fn payload(&self, tool: &str) -> ErrorPayload {
        let (error, message, details) = match self {
            Self::InvalidInput(msg) => ("Invalid input".to_string(), msg.clone(), None),
            Self::InvalidResourceConfig(_) => {
                ("Invalid resource config".to_string(), self.to_string(), None)
            }
            Self::PolicyAlreadyExists(_) => {
                ("Policy already exists".to_string(), self.to_string(), None)
            }
            Self::ContextAlreadyExists(_) => {
                ("Context already exists".to_string(), self.to_string(), None)
            }
            Self::NotFound { kind, .. } => (
                self.to_string(),
                format!(
                    "The specified {} does not exist in the cluster",
                    kind.to_lowercase()
                ),
                None,
            ),
            Self::ApiNotAccessible => (
                self.to_string(),
                API_NOT_ACCESSIBLE_GUIDANCE.to_string(),
                None,
            ),
            Self::Upstream {
                message, details, ..
            } => (
                self.to_string(),
                message.clone(),
                Some(details.clone().unwrap_or_else(|| NO_DETAILS.to_string())),
            ),
            Self::Unexpected(cause) => (
                cause.clone(),
                format!(
                    "Failed to run '{}'. Please check the input parameters and cluster configuration.",
                    tool
                ),
                None,
            ),
        };

        ErrorPayload {
            error,
            message,
            details,
        }
    }
}

impl From<PolicyError> for ToolError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidInput(msg) => Self::InvalidInput(msg),
            PolicyError::InvalidResourceConfig(entry) => Self::InvalidResourceConfig(entry),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

impl From<KubeApiError> for ToolError {
    fn from(err: KubeApiError) -> Self {
        match err {
            KubeApiError::NotFound { kind, name } => Self::NotFound { kind, name },
            KubeApiError::Api {
                status,
                message,
                body,
            } => Self::Upstream {
                status,
                message,
                details: body,
            },
            KubeApiError::ContextNotFound(name) => Self::not_found("Context", name),
            KubeApiError::ContextExists(name) => Self::ContextAlreadyExists(name),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_payload() {
        let payload = ToolError::invalid_input("Policy name cannot be empty")
            .payload("create_binding_policy");

        assert_eq!(payload.error, "Invalid input");
        assert_eq!(payload.message, "Policy name cannot be empty");
        assert_eq!(payload.details, None);
    }

    #[test]
    fn test_invalid_resource_config_payload() {
        let payload = ToolError::InvalidResourceConfig(r#"{"CreateOnly":true}"#.to_string())
            .payload("create_binding_policy");

        assert_eq!(payload.error, "Invalid resource config");
        assert_eq!(
            payload.message,
            r#"Invalid resource configuration: {"CreateOnly":true}"#
        );
    }

    #[test]
    fn test_already_exists_payloads() {
        let policy = ToolError::PolicyAlreadyExists("p1".into()).payload("create_binding_policy");
        assert_eq!(policy.error, "Policy already exists");
        assert_eq!(policy.message, "Binding policy 'p1' already exists");

        let context = ToolError::ContextAlreadyExists("wds1".into()).payload("create_wds_context");
        assert_eq!(context.error, "Context already exists");
        assert_eq!(context.message, "WDS context 'wds1' already exists");
    }

    #[test]
    fn test_not_found_payload() {
        let payload = ToolError::not_found("Binding policy", "p1").payload("get_binding_policy_details");

        assert_eq!(payload.error, "Binding policy 'p1' not found");
        assert_eq!(
            payload.message,
            "The specified binding policy does not exist in the cluster"
        );
    }

    #[test]
    fn test_upstream_payload_defaults_details() {
        let payload = ToolError::Upstream {
            status: 403,
            message: "forbidden".into(),
            details: None,
        }
        .payload("list_binding_policies");

        assert_eq!(payload.error, "Kubernetes API error: 403");
        assert_eq!(payload.message, "forbidden");
        assert_eq!(payload.details.as_deref(), Some("No details available"));
    }

    #[test]
    fn test_unexpected_payload_names_tool() {
        let payload = ToolError::Unexpected("connection refused".into()).payload("list_pods");

        assert_eq!(payload.error, "connection refused");
        assert!(payload.message.starts_with("Failed to run 'list_pods'."));
    }

    #[test]
    fn test_payload_serialization_skips_empty_details() {
        let json = serde_json::to_value(ToolError::ApiNotAccessible.payload("x")).unwrap();
        assert_eq!(json["error"], "BindingPolicy API not accessible");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_kube_error_conversion() {
        let err: ToolError = KubeApiError::Api {
            status: 500,
            message: "boom".into(),
            body: Some("{}".into()),
        }
        .into();
        assert_eq!(
            err,
            ToolError::Upstream {
                status: 500,
                message: "boom".into(),
                details: Some("{}".into())
            }
        );

        let err: ToolError = KubeApiError::not_found("Pod", "web").into();
        assert_eq!(err, ToolError::not_found("Pod", "web"));

        let err: ToolError = KubeApiError::Transport("refused".into()).into();
        assert!(matches!(err, ToolError::Unexpected(_)));
    }
}
