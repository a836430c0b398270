//! Error Types for agent assembly

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("Model '{model}' is missing required client argument '{arg}'")]
    MissingClientArg { model: String, arg: String },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to render template {}: {cause}", path.display())]
    TemplateRenderError { path: PathBuf, cause: String },

    #[error("Agent not declared: {0}")]
    AgentNotFound(String),

    #[error("No agents configured")]
    NoAgentsConfigured,

    #[error(transparent)]
    Config(#[from] mori_config::ConfigError),

    #[error(transparent)]
    Core(#[from] mori_core::CoreError),
}

impl RuntimeError {
    /// Errors that only affect the agent being built
    pub const fn is_agent_local(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound(_)
                | Self::TemplateRenderError { .. }
                | Self::MissingClientArg { .. }
                | Self::UnsupportedModelType(_)
        )
    }
}
