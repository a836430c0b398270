//! Provider Formatters
//!
//! Each provider family expects chat history in its own wire shape. A
//! [`Formatter`] turns the shared [`Message`] model into that shape so the
//! rest of the system never deals with provider specifics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mori_core::formatter::{Formatter, OpenAiChatFormatter};
//!
//! let payload = OpenAiChatFormatter.format(&messages)?;
//! ```

use serde_json::{json, Map, Value};

use crate::error::{CoreError, Result};
use crate::message::{extract_text, ContentBlock, Message, Reply, Role};

/// Converts messages into a provider's request-message JSON
pub trait Formatter: Send + Sync + std::fmt::Debug {
    /// Short identifier, e.g. "openai_chat"
    fn name(&self) -> &'static str;

    /// Format a conversation
    fn format(&self, messages: &[Message]) -> Result<Value>;
}

/// OpenAI chat-completions `messages` array
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiChatFormatter;

impl Formatter for OpenAiChatFormatter {
    fn name(&self) -> &'static str {
        "openai_chat"
    }

    fn format(&self, messages: &[Message]) -> Result<Value> {
        let mut out = Vec::new();

        for msg in messages {
            let blocks = msg.content.blocks();

            // Tool results become standalone `tool` messages
            for block in &blocks {
                if let ContentBlock::ToolResult { id, output, .. } = block {
                    out.push(json!({"role": "tool", "tool_call_id": id, "content": output}));
                }
            }

            let mut parts = Vec::new();
            let mut tool_calls = Vec::new();
            for block in &blocks {
                match block {
                    ContentBlock::Text { text } => parts.push(json!({"type": "text", "text": text})),
                    ContentBlock::Image { source } => parts.push(json!({
                        "type": "image_url",
                        "image_url": {"url": source.as_url()},
                    })),
                    ContentBlock::ToolUse { id, name, input } => tool_calls.push(json!({
                        "id": id,
                        "type": "function",
                        "function": {"name": name, "arguments": serde_json::to_string(input)?},
                    })),
                    ContentBlock::Thinking { .. }
                    | ContentBlock::Audio { .. }
                    | ContentBlock::ToolResult { .. } => {}
                }
            }

            if parts.is_empty() && tool_calls.is_empty() {
                continue;
            }

            let mut entry = Map::new();
            entry.insert("role".into(), json!(msg.role.to_string()));
            if let Some(name) = &msg.name {
                entry.insert("name".into(), json!(name));
            }
            let content = match &msg.content {
                Reply::PlainText(text) => json!(text),
                Reply::Blocks(_) if parts.is_empty() => Value::Null,
                Reply::Blocks(_) => Value::Array(parts),
            };
            entry.insert("content".into(), content);
            if !tool_calls.is_empty() {
                entry.insert("tool_calls".into(), Value::Array(tool_calls));
            }
            out.push(Value::Object(entry));
        }

        Ok(Value::Array(out))
    }
}

/// Flatten every message to `{role, content: string}`
fn format_plain(messages: &[Message]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|msg| {
                let content = match &msg.content {
                    Reply::PlainText(text) => text.clone(),
                    reply @ Reply::Blocks(blocks) => {
                        let tool_output: String = blocks
                            .iter()
                            .filter_map(|b| match b {
                                ContentBlock::ToolResult { output, .. } => Some(output.as_str()),
                                _ => None,
                            })
                            .collect();
                        extract_text(reply) + &tool_output
                    }
                };
                json!({"role": msg.role.to_string(), "content": content})
            })
            .collect(),
    )
}

/// DashScope chat messages
#[derive(Clone, Copy, Debug, Default)]
pub struct DashScopeChatFormatter;

impl Formatter for DashScopeChatFormatter {
    fn name(&self) -> &'static str {
        "dashscope_chat"
    }

    fn format(&self, messages: &[Message]) -> Result<Value> {
        Ok(format_plain(messages))
    }
}

/// Ollama `/api/chat` messages
#[derive(Clone, Copy, Debug, Default)]
pub struct OllamaChatFormatter;

impl Formatter for OllamaChatFormatter {
    fn name(&self) -> &'static str {
        "ollama_chat"
    }

    fn format(&self, messages: &[Message]) -> Result<Value> {
        Ok(format_plain(messages))
    }
}

/// Anthropic messages API: system prompt split out, content as blocks
#[derive(Clone, Copy, Debug, Default)]
pub struct AnthropicChatFormatter;

impl Formatter for AnthropicChatFormatter {
    fn name(&self) -> &'static str {
        "anthropic_chat"
    }

    fn format(&self, messages: &[Message]) -> Result<Value> {
        let mut system = Vec::new();
        let mut out = Vec::new();

        for msg in messages {
            if msg.role == Role::System {
                system.push(msg.text());
                continue;
            }

            let mut content = Vec::new();
            for block in msg.content.blocks() {
                match block {
                    ContentBlock::Text { text } => content.push(json!({"type": "text", "text": text})),
                    ContentBlock::Image { source } => content.push(json!({"type": "image", "source": source})),
                    ContentBlock::ToolUse { id, name, input } => content.push(json!({
                        "type": "tool_use", "id": id, "name": name, "input": input,
                    })),
                    ContentBlock::ToolResult { id, output, .. } => content.push(json!({
                        "type": "tool_result", "tool_use_id": id, "content": output,
                    })),
                    ContentBlock::Thinking { .. } | ContentBlock::Audio { .. } => {}
                }
            }

            // Tool results travel in user turns
            let role = match msg.role {
                Role::Assistant => "assistant",
                _ => "user",
            };
            out.push(json!({"role": role, "content": content}));
        }

        let mut payload = Map::new();
        if !system.is_empty() {
            payload.insert("system".into(), json!(system.join("\n")));
        }
        payload.insert("messages".into(), Value::Array(out));
        Ok(Value::Object(payload))
    }
}

/// Gemini `generateContent`: `contents` with `parts`, `model` role
#[derive(Clone, Copy, Debug, Default)]
pub struct GeminiChatFormatter;

impl Formatter for GeminiChatFormatter {
    fn name(&self) -> &'static str {
        "gemini_chat"
    }

    fn format(&self, messages: &[Message]) -> Result<Value> {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            if msg.role == Role::System {
                system.push(json!({"text": msg.text()}));
                continue;
            }

            let mut parts = Vec::new();
            for block in msg.content.blocks() {
                match block {
                    ContentBlock::Text { text } => parts.push(json!({"text": text})),
                    ContentBlock::Image { source } => match source {
                        crate::message::MediaSource::Base64 { media_type, data } => {
                            parts.push(json!({"inline_data": {"mime_type": media_type, "data": data}}));
                        }
                        crate::message::MediaSource::Url { url } => {
                            parts.push(json!({"file_data": {"file_uri": url}}));
                        }
                    },
                    ContentBlock::ToolUse { name, input, .. } => {
                        parts.push(json!({"function_call": {"name": name, "args": input}}));
                    }
                    ContentBlock::ToolResult { name, output, .. } => parts.push(json!({
                        "function_response": {"name": name, "response": {"output": output}},
                    })),
                    ContentBlock::Thinking { .. } | ContentBlock::Audio { .. } => {}
                }
            }

            if parts.is_empty() {
                return Err(CoreError::Format(format!(
                    "{} message has no content Gemini can carry",
                    msg.role
                )));
            }

            let role = if msg.role == Role::Assistant { "model" } else { "user" };
            contents.push(json!({"role": role, "parts": parts}));
        }

        let mut payload = Map::new();
        if !system.is_empty() {
            payload.insert("system_instruction".into(), json!({"parts": system}));
        }
        payload.insert("contents".into(), Value::Array(contents));
        Ok(Value::Object(payload))
    }
}
