//! MCP tools for KubeStellar and Kubernetes operations.
//!
//! Each tool is a free async function over a [`KubeApi`](kube_api_interface::KubeApi)
//! or [`ContextStore`](kube_api_interface::ContextStore) taking a typed input and
//! returning a typed output. The server decodes arguments, resolves the client
//! for the requested context and encodes the result.

pub mod binding_policy;
pub mod cluster;
pub mod namespace;
pub mod pod;
pub mod space;

pub use binding_policy::*;
pub use cluster::*;
pub use namespace::*;
pub use pod::*;
pub use space::*;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ToolError, ToolResult};

/// Inputs that name the kubeconfig context to run against.
pub trait ContextArg {
    fn context(&self) -> Option<&str>;
}

macro_rules! context_arg {
    ($($input:ty),* $(,)?) => {
        $(
            impl $crate::tools::ContextArg for $input {
                fn context(&self) -> Option<&str> {
                    self.context.as_deref()
                }
            }
        )*
    };
}
pub(crate) use context_arg;

/// Input for tools that only take an optional context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContextInput {
    /// Kubeconfig context to use; defaults to the current context
    #[serde(default)]
    pub context: Option<String>,
}

context_arg!(ContextInput);

/// Input for tools without arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoInput {}

/// Decode tool arguments; absent arguments decode as an empty object.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ToolError::invalid_input(format!("Invalid arguments: {}", e)))
}

/// Encode a tool output as the JSON value placed in the tool result.
pub fn encode<T: Serialize>(output: &T) -> ToolResult<Value> {
    serde_json::to_value(output).map_err(|e| ToolError::Unexpected(e.to_string()))
}
