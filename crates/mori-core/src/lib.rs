//! # mori-core
//!
//! Provider-agnostic building blocks for mori agents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AgentUnit                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   Message   │  │   Toolkit   │  │     Formatter       │  │
//! │  │   / Reply   │──│  (contract) │──│  (per provider)     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Replies enter through [`Reply::from_value`] and leave as text through
//! [`extract_text`]. Tools always answer with a [`ToolResponse`].

pub mod error;
pub mod formatter;
pub mod message;
pub mod tool;

pub use error::{CoreError, Result};
pub use formatter::Formatter;
pub use message::{extract_text, extract_text_value, ContentBlock, Message, Reply, Role};
pub use tool::{FunctionTool, Tool, ToolCall, ToolOutcome, ToolResponse, ToolSchema, Toolkit};
