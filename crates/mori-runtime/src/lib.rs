//! # mori-runtime
//!
//! Assembles agents from configuration.
//!
//! ## Flow
//!
//! ```text
//! models.yaml ──► bind_model ──► BoundModel (model + formatter) ─┐
//! agents.yaml ──► TemplateResolver ──► system prompt ────────────┼──► AgentUnit
//!                 create_toolkit ──► Toolkit ────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mori_runtime::AgentFactory;
//!
//! let factory = AgentFactory::from_config_dir("config")?;
//! let unit = factory.build_default()?;
//! println!("{}", unit.sys_prompt);
//! ```

pub mod binder;
pub mod error;
pub mod factory;
pub mod template;
pub mod tools;

pub use binder::{bind_model, BoundModel, ChatModel, ModelType};
pub use error::{Result, RuntimeError};
pub use factory::{AgentFactory, AgentUnit};
pub use template::{
    build_runtime_context, builtin_template, Clock, FixedClock, ResolvedTemplate, RuntimeContext, SystemClock,
    TemplateResolver, TemplateSource,
};
pub use tools::create_toolkit;

// Re-export core types for convenience
pub use mori_config::{load_config, LoadedConfig};
pub use mori_core::{extract_text, extract_text_value, Reply, Tool, ToolResponse, Toolkit};
