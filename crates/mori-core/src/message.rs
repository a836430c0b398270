//! Conversation Messages
//!
//! Message and content-block model shared by formatters and tools, plus the
//! boundary that turns an agent reply into plain text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Role of a message sender
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Where the bytes of a media block live
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    Url { url: String },
    Base64 { media_type: String, data: String },
}

impl MediaSource {
    /// Render as a URL, using a data URL for inline payloads
    pub fn as_url(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

/// A typed piece of message content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    Image {
        source: MediaSource,
    },
    Audio {
        source: MediaSource,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        id: String,
        name: String,
        output: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text payload for textual blocks, `None` for everything else
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// An agent reply as it enters the core: either plain text or typed blocks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    PlainText(String),
    Blocks(Vec<ContentBlock>),
}

impl Reply {
    /// Classify a raw reply once.
    ///
    /// Strings inside a block list are accepted as text blocks. Any other
    /// element must match a known [`ContentBlock`] shape.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Self::PlainText(text.clone())),
            Value::Array(items) => items
                .iter()
                .map(parse_block)
                .collect::<Result<Vec<_>>>()
                .map(Self::Blocks),
            other => Err(CoreError::UnrecognizedResponseBlock(other.to_string())),
        }
    }

    /// Iterate the blocks, treating plain text as a single text block
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match self {
            Self::PlainText(text) => vec![ContentBlock::text(text.clone())],
            Self::Blocks(blocks) => blocks.clone(),
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::PlainText(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::PlainText(text.to_string())
    }
}

impl From<Vec<ContentBlock>> for Reply {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Blocks(blocks)
    }
}

fn parse_block(item: &Value) -> Result<ContentBlock> {
    match item {
        Value::String(text) => Ok(ContentBlock::text(text.clone())),
        Value::Object(_) => serde_json::from_value(item.clone())
            .map_err(|_| CoreError::UnrecognizedResponseBlock(item.to_string())),
        other => Err(CoreError::UnrecognizedResponseBlock(other.to_string())),
    }
}

/// Plain text of a reply.
///
/// Text blocks are concatenated in order without a separator; non-text
/// blocks are skipped.
pub fn extract_text(reply: &Reply) -> String {
    match reply {
        Reply::PlainText(text) => text.clone(),
        Reply::Blocks(blocks) => blocks.iter().filter_map(ContentBlock::as_text).collect(),
    }
}

/// Classify a raw JSON reply and extract its text
pub fn extract_text_value(value: &Value) -> Result<String> {
    Reply::from_value(value).map(|reply| extract_text(&reply))
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Content, plain or block-structured
    pub content: Reply,

    /// Optional speaker name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<Reply>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<Reply>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<Reply>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<Reply>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message
    pub fn tool_result(id: impl Into<String>, name: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(
            Role::Tool,
            vec![ContentBlock::ToolResult {
                id: id.into(),
                name: name.into(),
                output: output.into(),
            }],
        )
    }

    /// Add a name to the message
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Plain text of the message content
    pub fn text(&self) -> String {
        extract_text(&self.content)
    }
}
