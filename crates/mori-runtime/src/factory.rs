//! Agent assembly
//!
//! Turns validated declarations into [`AgentUnit`]s: model plus formatter,
//! rendered system prompt and toolkit. The reasoning loop that consumes a
//! unit lives outside this crate.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use mori_config::{AgentDeclaration, LoadedConfig, Params};
use mori_core::Toolkit;

use crate::binder::{bind_model, BoundModel};
use crate::error::{Result, RuntimeError};
use crate::template::{Clock, SystemClock, TemplateResolver};
use crate::tools::create_toolkit;

/// Everything an agent runtime needs to start one agent
pub struct AgentUnit {
    pub name: String,
    pub model: BoundModel,
    pub sys_prompt: String,
    pub toolkit: Arc<Toolkit>,
    pub parallel_tool_calls: bool,
    pub memory_config: Params,
}

impl std::fmt::Debug for AgentUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentUnit")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("sys_prompt", &self.sys_prompt)
            .field("tools", &self.toolkit.names())
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .finish_non_exhaustive()
    }
}

/// Builds agents from a loaded configuration
pub struct AgentFactory {
    config: LoadedConfig,
    templates: TemplateResolver,
    clock: Arc<dyn Clock>,
}

impl AgentFactory {
    pub fn new(config: LoadedConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: LoadedConfig, clock: Arc<dyn Clock>) -> Self {
        let templates = TemplateResolver::from_settings(&config.global().template).with_clock(Arc::clone(&clock));
        Self {
            config,
            templates,
            clock,
        }
    }

    /// Load configuration from `dir` (process environment) and wrap it
    pub fn from_config_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(mori_config::load_config(dir)?))
    }

    pub const fn config(&self) -> &LoadedConfig {
        &self.config
    }

    pub const fn templates(&self) -> &TemplateResolver {
        &self.templates
    }

    /// Build a declared agent by name
    pub fn build(&self, name: &str) -> Result<AgentUnit> {
        let decl = self
            .config
            .agent(name)
            .ok_or_else(|| RuntimeError::AgentNotFound(name.to_string()))?;
        self.build_declared(decl)
    }

    /// Build the first declared agent
    pub fn build_default(&self) -> Result<AgentUnit> {
        let decl = self.config.agents().first().ok_or(RuntimeError::NoAgentsConfigured)?;
        self.build_declared(decl)
    }

    /// Build every declared agent; each result stands on its own
    pub fn build_all(&self) -> Vec<(String, Result<AgentUnit>)> {
        self.config
            .agents()
            .iter()
            .map(|decl| {
                let result = self.build_declared(decl);
                if let Err(e) = &result {
                    warn!(agent = %decl.name, error = %e, "agent construction failed");
                }
                (decl.name.clone(), result)
            })
            .collect()
    }

    fn build_declared(&self, decl: &AgentDeclaration) -> Result<AgentUnit> {
        let model_decl = self.config.model(&decl.model).ok_or_else(|| {
            mori_config::ConfigError::UnresolvedModelReference {
                agent: decl.name.clone(),
                model: decl.model.clone(),
            }
        })?;
        let model = bind_model(model_decl)?;

        let sys_prompt = match &decl.sys_prompt {
            Some(prompt) => prompt.clone(),
            None => self
                .templates
                .resolve_and_render(&decl.template, &decl.template_vars)?
                .trim()
                .to_string(),
        };

        let timeout = Duration::from_secs(self.config.global().tool_timeout_secs);
        let toolkit = create_toolkit(&self.clock, timeout)?;

        info!(
            agent = %decl.name,
            model = %model.model().model_name,
            formatter = model.formatter().name(),
            tools = toolkit.len(),
            "agent ready"
        );

        Ok(AgentUnit {
            name: decl.name.clone(),
            model,
            sys_prompt,
            toolkit: Arc::new(toolkit),
            parallel_tool_calls: decl.parallel_tool_calls,
            memory_config: decl.memory_config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FixedClock;
    use mori_config::ConfigLoader;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
    }

    impl Fixture {
        fn new(models: &str, agents: &str) -> Self {
            let root = TempDir::new().unwrap();
            let config = root.path().join("config");
            fs::create_dir_all(config.join("template")).unwrap();
            fs::create_dir_all(root.path().join("builtin")).unwrap();

            let global = format!(
                "global:\n  log_dir: null\n  template:\n    override_dir: {}\n    builtin_dir: {}\n",
                config.join("template").display(),
                root.path().join("builtin").display(),
            );
            fs::write(config.join("config.yaml"), global).unwrap();
            fs::write(config.join("models.yaml"), models).unwrap();
            fs::write(config.join("agents.yaml"), agents).unwrap();
            Self { root }
        }

        fn write_builtin(&self, name: &str, body: &str) {
            fs::write(self.root.path().join("builtin").join(name), body).unwrap();
        }

        fn write_override(&self, name: &str, body: &str) {
            fs::write(self.root.path().join("config/template").join(name), body).unwrap();
        }

        fn factory(&self) -> AgentFactory {
            let config = ConfigLoader::new(self.root.path().join("config"))
                .with_env(HashMap::from([("KEY".to_string(), "sk".to_string())]))
                .load()
                .unwrap();
            AgentFactory::with_clock(config, Arc::new(FixedClock::at(2024, 3, 15, 9, 0, 0).unwrap()))
        }
    }

    const MODELS: &str = "models:\n  - name: gpt4\n    model_type: openai-compatible\n    api_key: ${KEY}\n    client_args:\n      base_url: \"https://x\"\n";
    const AGENTS: &str = "agents:\n  - name: mori\n    model: gpt4\n    template: mori\n    parallel_tool_calls: true\n    vars:\n      nickname: Mori\n";

    #[test]
    fn test_end_to_end_builtin_template() {
        let fx = Fixture::new(MODELS, AGENTS);
        fx.write_builtin("mori.jinja2", "I am {{ nickname }}. Today: {{ current_date }}\n");

        let unit = fx.factory().build("mori").unwrap();
        assert_eq!(unit.sys_prompt, "I am Mori. Today: 2024-03-15 Friday");
        assert_eq!(unit.model.formatter().name(), "openai_chat");
        assert_eq!(unit.model.model().api_key.as_deref(), Some("sk"));
        assert!(unit.parallel_tool_calls);
        assert_eq!(unit.toolkit.len(), 3);
    }

    #[test]
    fn test_override_template_used() {
        let fx = Fixture::new(MODELS, AGENTS);
        fx.write_builtin("mori.jinja2", "builtin");
        fx.write_override("mori.jinja2", "override");

        assert_eq!(fx.factory().build("mori").unwrap().sys_prompt, "override");
    }

    #[test]
    fn test_missing_base_url_fails_binding() {
        let models = "models:\n  - name: gpt4\n    model_type: openai-compatible\n    client_args: {}\n";
        let fx = Fixture::new(models, AGENTS);
        fx.write_builtin("mori.jinja2", "hi");

        let err = fx.factory().build("mori").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MissingClientArg { ref model, ref arg } if model == "gpt4" && arg == "base_url"
        ));
    }

    #[test]
    fn test_sys_prompt_skips_template() {
        let agents = "agents:\n  - name: mori\n    model: gpt4\n    template: missing\n    sys_prompt: Be brief.\n";
        let fx = Fixture::new(MODELS, agents);
        assert_eq!(fx.factory().build("mori").unwrap().sys_prompt, "Be brief.");
    }

    #[test]
    fn test_one_bad_template_does_not_block_others() {
        let agents = "agents:\n  - name: good\n    model: gpt4\n    template: mori\n    vars: { nickname: A }\n  - name: bad\n    model: gpt4\n    template: ghost\n";
        let fx = Fixture::new(MODELS, agents);
        fx.write_builtin("mori.jinja2", "{{ nickname }}");

        let results = fx.factory().build_all();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().unwrap().sys_prompt, "A");
        assert!(matches!(results[1].1, Err(RuntimeError::TemplateNotFound(_))));
        assert!(results[1].1.as_ref().unwrap_err().is_agent_local());
    }

    #[test]
    fn test_unknown_agent_and_default() {
        let fx = Fixture::new(MODELS, AGENTS);
        fx.write_builtin("mori.jinja2", "x");
        let factory = fx.factory();

        assert!(matches!(factory.build("nobody"), Err(RuntimeError::AgentNotFound(_))));
        assert_eq!(factory.build_default().unwrap().name, "mori");
    }

    #[test]
    fn test_no_agents_configured() {
        let fx = Fixture::new(MODELS, "agents: []\n");
        assert!(matches!(fx.factory().build_default(), Err(RuntimeError::NoAgentsConfigured)));
    }
}
