//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// A tool with the same name is already registered
    #[error("Duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// Tool not found in toolkit
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Tool did not finish within the configured timeout
    #[error("Tool '{name}' timed out after {limit:?}")]
    ToolTimeout { name: String, limit: Duration },

    /// A reply block that matches no known content shape
    #[error("Unrecognized response block: {0}")]
    UnrecognizedResponseBlock(String),

    /// Message could not be converted to a provider wire shape
    #[error("Format error: {0}")]
    Format(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the error originated inside a tool call
    pub const fn is_tool_error(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound(_)
                | Self::ToolValidation(_)
                | Self::ToolExecution(_)
                | Self::ToolTimeout { .. }
        )
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::ToolExecution(format!("{err:#}"))
    }
}
