//! Model ↔ formatter binding
//!
//! Every provider family parses and produces its own wire shape, so a model
//! is only ever handed out together with the formatter for its family.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use mori_config::{ModelDeclaration, Params};
use mori_core::formatter::{
    AnthropicChatFormatter, DashScopeChatFormatter, Formatter, GeminiChatFormatter, OllamaChatFormatter,
    OpenAiChatFormatter,
};

use crate::error::{Result, RuntimeError};

/// Provider family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    OpenAi,
    DashScope,
    Anthropic,
    Gemini,
    Ollama,
}

impl FromStr for ModelType {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" | "openai_compatible" => Ok(Self::OpenAi),
            "dashscope" => Ok(Self::DashScope),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(RuntimeError::UnsupportedModelType(s.to_string())),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::DashScope => "dashscope",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        };
        f.write_str(name)
    }
}

struct Binding {
    model_type: ModelType,
    required_args: &'static [&'static str],
    formatter: fn() -> Arc<dyn Formatter>,
}

fn openai_formatter() -> Arc<dyn Formatter> {
    Arc::new(OpenAiChatFormatter)
}

fn dashscope_formatter() -> Arc<dyn Formatter> {
    Arc::new(DashScopeChatFormatter)
}

fn anthropic_formatter() -> Arc<dyn Formatter> {
    Arc::new(AnthropicChatFormatter)
}

fn gemini_formatter() -> Arc<dyn Formatter> {
    Arc::new(GeminiChatFormatter)
}

fn ollama_formatter() -> Arc<dyn Formatter> {
    Arc::new(OllamaChatFormatter)
}

const BINDINGS: &[Binding] = &[
    Binding {
        model_type: ModelType::OpenAi,
        required_args: &["base_url"],
        formatter: openai_formatter,
    },
    Binding {
        model_type: ModelType::DashScope,
        required_args: &[],
        formatter: dashscope_formatter,
    },
    Binding {
        model_type: ModelType::Anthropic,
        required_args: &[],
        formatter: anthropic_formatter,
    },
    Binding {
        model_type: ModelType::Gemini,
        required_args: &[],
        formatter: gemini_formatter,
    },
    Binding {
        model_type: ModelType::Ollama,
        required_args: &[],
        formatter: ollama_formatter,
    },
];

/// Client arguments a model type cannot be bound without
pub fn required_client_args(model_type: ModelType) -> &'static [&'static str] {
    BINDINGS
        .iter()
        .find(|b| b.model_type == model_type)
        .map(|b| b.required_args)
        .unwrap_or_default()
}

/// What the provider client needs to talk to one model
#[derive(Clone, Debug, Serialize)]
pub struct ChatModel {
    pub model_name: String,
    pub model_type: ModelType,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub client_args: Params,
    pub generate_kwargs: Params,
}

/// A model paired with the formatter for its provider family
#[derive(Clone, Debug)]
pub struct BoundModel {
    model: ChatModel,
    formatter: Arc<dyn Formatter>,
}

impl BoundModel {
    pub const fn model(&self) -> &ChatModel {
        &self.model
    }

    pub fn formatter(&self) -> Arc<dyn Formatter> {
        Arc::clone(&self.formatter)
    }
}

/// Bind a declared model to its formatter
pub fn bind_model(decl: &ModelDeclaration) -> Result<BoundModel> {
    let model_type: ModelType = decl.model_type.parse()?;
    let binding = BINDINGS
        .iter()
        .find(|b| b.model_type == model_type)
        .ok_or_else(|| RuntimeError::UnsupportedModelType(decl.model_type.clone()))?;

    for arg in binding.required_args {
        if decl.client_arg(arg).is_none() {
            return Err(RuntimeError::MissingClientArg {
                model: decl.name.clone(),
                arg: (*arg).to_string(),
            });
        }
    }

    let formatter = (binding.formatter)();
    debug!(model = %decl.name, %model_type, formatter = formatter.name(), "bound model");

    Ok(BoundModel {
        model: ChatModel {
            model_name: decl.name.clone(),
            model_type,
            api_key: decl.api_key.clone(),
            client_args: decl.effective_client_args(),
            generate_kwargs: decl.generate_kwargs.clone(),
        },
        formatter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decl(model_type: &str, client_args: Params) -> ModelDeclaration {
        ModelDeclaration {
            name: "gpt4".into(),
            model_type: model_type.into(),
            api_key: Some("sk".into()),
            base_url: None,
            client_args,
            generate_kwargs: Params::from([("temperature".to_string(), json!(0.7))]),
        }
    }

    #[test]
    fn test_openai_binds_openai_formatter() {
        let args = Params::from([("base_url".to_string(), json!("https://x"))]);
        let bound = bind_model(&decl("openai-compatible", args)).unwrap();

        assert_eq!(bound.model().model_type, ModelType::OpenAi);
        assert_eq!(bound.formatter().name(), "openai_chat");
        assert_eq!(bound.model().client_args["base_url"], json!("https://x"));
        assert_eq!(bound.model().generate_kwargs["temperature"], json!(0.7));
    }

    #[test]
    fn test_missing_base_url() {
        let err = bind_model(&decl("openai-compatible", Params::new())).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MissingClientArg { ref model, ref arg } if model == "gpt4" && arg == "base_url"
        ));
    }

    #[test]
    fn test_top_level_base_url_counts() {
        let mut model = decl("OpenAI", Params::new());
        model.base_url = Some("http://localhost:8000/v1".into());
        let bound = bind_model(&model).unwrap();
        assert_eq!(bound.model().client_args["base_url"], json!("http://localhost:8000/v1"));
    }

    #[test]
    fn test_unsupported_type() {
        let err = bind_model(&decl("llamafile", Params::new())).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedModelType(ref t) if t == "llamafile"));
    }

    #[test]
    fn test_every_type_has_a_binding() {
        for (raw, formatter) in [
            ("dashscope", "dashscope_chat"),
            ("anthropic", "anthropic_chat"),
            ("gemini", "gemini_chat"),
            ("ollama", "ollama_chat"),
        ] {
            let bound = bind_model(&decl(raw, Params::new())).unwrap();
            assert_eq!(bound.formatter().name(), formatter);
            assert!(required_client_args(bound.model().model_type).is_empty());
        }
        assert_eq!(required_client_args(ModelType::OpenAi), &["base_url"]);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let args = Params::from([("base_url".to_string(), json!("https://x"))]);
        let bound = bind_model(&decl("openai", args)).unwrap();
        let value = serde_json::to_value(bound.model()).unwrap();
        assert!(value.get("api_key").is_none());
        assert_eq!(value["model_type"], "openai");
    }
}
