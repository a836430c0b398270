//! # mori-config
//!
//! Loads the global, model and agent YAML documents, interpolates `${NAME}`
//! placeholders from the environment and cross-checks names. A load either
//! succeeds completely or returns the first error.
//!
//! ```rust,ignore
//! let config = mori_config::load_config("config")?;
//! for agent in config.agents() {
//!     println!("{} -> {}", agent.name, agent.model);
//! }
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod schema;

pub use env::{resolve_env, EnvSource, ProcessEnv};
pub use error::{ConfigError, Result};
pub use loader::{load_config, ConfigLoader, LoadedConfig};
pub use schema::{AgentDeclaration, GlobalConfig, ModelDeclaration, Params, TemplateSettings};
