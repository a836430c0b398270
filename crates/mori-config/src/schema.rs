//! Configuration schema for the three YAML documents.
//!
//! ```yaml
//! # config.yaml (optional)
//! global:
//!   log_level: INFO
//!   log_dir: logs
//!   tool_timeout_secs: 30
//!   template:
//!     override_dir: config/template
//!     variables: { user_name: friend }
//!
//! # models.yaml
//! models:
//!   - name: gpt4
//!     model_type: openai-compatible
//!     api_key: ${OPENAI_API_KEY}
//!     client_args: { base_url: "https://api.openai.com/v1" }
//!     generate_kwargs: { temperature: 0.7 }
//!
//! # agents.yaml
//! agents:
//!   - name: mori
//!     model: gpt4
//!     template: mori
//!     parallel_tool_calls: true
//!     vars: { nickname: Mori }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Free-form key/value mapping
pub type Params = BTreeMap<String, Value>;

/// Process-wide settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,

    /// Directory for `mori.log`; `None` disables file logging
    pub log_dir: Option<PathBuf>,

    /// Upper bound for a single tool call
    pub tool_timeout_secs: u64,

    pub template: TemplateSettings,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".into(),
            log_dir: Some(PathBuf::from("logs")),
            tool_timeout_secs: 30,
            template: TemplateSettings::default(),
        }
    }
}

/// Where templates are looked up and which defaults they see
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Checked first
    pub override_dir: PathBuf,

    /// Checked second; `None` means the templates shipped with the runtime
    pub builtin_dir: Option<PathBuf>,

    /// Default variables for every render
    pub variables: Params,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            override_dir: PathBuf::from("config/template"),
            builtin_dir: None,
            variables: Params::new(),
        }
    }
}

/// A named model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDeclaration {
    #[serde(alias = "model_name")]
    pub name: String,

    /// Provider family, e.g. `openai-compatible`
    pub model_type: String,

    #[serde(default, deserialize_with = "scalar_string")]
    pub api_key: Option<String>,

    /// Shorthand for `client_args.base_url`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub client_args: Params,

    /// Sampling parameters such as temperature or `max_tokens`
    #[serde(default)]
    pub generate_kwargs: Params,
}

impl ModelDeclaration {
    /// Look up a client argument, falling back to top-level shorthands.
    /// Null and empty-string values count as absent.
    pub fn client_arg(&self, key: &str) -> Option<Value> {
        let value = self.client_args.get(key).cloned().or_else(|| match key {
            "base_url" => self.base_url.clone().map(Value::String),
            "api_key" => self.api_key.clone().map(Value::String),
            _ => None,
        })?;

        match &value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            _ => Some(value),
        }
    }

    /// `client_args` with the shorthands folded in
    pub fn effective_client_args(&self) -> Params {
        let mut args = self.client_args.clone();
        if let Some(url) = &self.base_url {
            args.entry("base_url".into())
                .or_insert_with(|| Value::String(url.clone()));
        }
        args
    }
}

/// Accept a number or bool where a string is expected. A key such as
/// `${KEY}` holding only digits arrives here as a number.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected a string, found {other}"))),
    }
}

/// A named agent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDeclaration {
    pub name: String,

    /// Must match a [`ModelDeclaration::name`]
    pub model: String,

    /// Short name (`mori`) or qualified path (`prompts/mori.jinja2`)
    pub template: String,

    /// Literal system prompt, used instead of the template when set
    #[serde(default)]
    pub sys_prompt: Option<String>,

    #[serde(default)]
    pub parallel_tool_calls: bool,

    #[serde(default)]
    pub memory_config: Params,

    /// Extra template variables
    #[serde(default, alias = "vars")]
    pub template_vars: Params,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GlobalDocument {
    #[serde(default)]
    pub global: GlobalConfig,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsDocument {
    #[serde(default)]
    pub models: Vec<ModelDeclaration>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentsDocument {
    #[serde(default)]
    pub agents: Vec<AgentDeclaration>,
}
