//! Error Types for configuration loading

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Duplicate model name: {0}")]
    DuplicateModelName(String),

    #[error("Duplicate agent name: {0}")]
    DuplicateAgentName(String),

    #[error("Agent '{agent}' references undeclared model '{model}'")]
    UnresolvedModelReference { agent: String, model: String },

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
