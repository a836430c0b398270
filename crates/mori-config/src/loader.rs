use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::env::{resolve_env, EnvSource, ProcessEnv};
use crate::error::{ConfigError, Result};
use crate::schema::{AgentDeclaration, AgentsDocument, GlobalConfig, GlobalDocument, ModelDeclaration, ModelsDocument};

pub const GLOBAL_FILE: &str = "config.yaml";
pub const MODELS_FILE: &str = "models.yaml";
pub const AGENTS_FILE: &str = "agents.yaml";

/// Fully validated configuration. Only a successful [`ConfigLoader::load`]
/// produces one.
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    global: GlobalConfig,
    models: Vec<ModelDeclaration>,
    agents: Vec<AgentDeclaration>,
}

impl LoadedConfig {
    pub const fn global(&self) -> &GlobalConfig {
        &self.global
    }

    /// Models in declaration order
    pub fn models(&self) -> &[ModelDeclaration] {
        &self.models
    }

    /// Agents in declaration order
    pub fn agents(&self) -> &[AgentDeclaration] {
        &self.agents
    }

    pub fn model(&self, name: &str) -> Option<&ModelDeclaration> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDeclaration> {
        self.agents.iter().find(|a| a.name == name)
    }
}

/// Loads `config.yaml`, `models.yaml` and `agents.yaml` from one directory
pub struct ConfigLoader<E = ProcessEnv> {
    dir: PathBuf,
    env: E,
}

impl ConfigLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env: ProcessEnv,
        }
    }
}

impl<E: EnvSource> ConfigLoader<E> {
    /// Resolve placeholders against `env` instead of the process environment
    pub fn with_env<F: EnvSource>(self, env: F) -> ConfigLoader<F> {
        ConfigLoader { dir: self.dir, env }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and cross-validate all three documents
    pub fn load(&self) -> Result<LoadedConfig> {
        let global_path = self.dir.join(GLOBAL_FILE);
        let global = if global_path.is_file() {
            self.read_document::<GlobalDocument>(&global_path)?.global
        } else {
            debug!(path = %global_path.display(), "no global config, using defaults");
            GlobalConfig::default()
        };

        let models = self
            .read_document::<ModelsDocument>(&self.dir.join(MODELS_FILE))?
            .models;
        let agents = self
            .read_document::<AgentsDocument>(&self.dir.join(AGENTS_FILE))?
            .agents;

        validate(&models, &agents)?;

        debug!(
            dir = %self.dir.display(),
            models = models.len(),
            agents = agents.len(),
            "configuration loaded"
        );
        Ok(LoadedConfig { global, models, agents })
    }

    fn read_document<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        debug!(path = %path.display(), "loading config document");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let yaml_err = |source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        };

        let raw: serde_yaml::Value = serde_yaml::from_str(&text).map_err(yaml_err)?;
        // An empty file parses as null
        let raw = if raw.is_null() {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        } else {
            raw
        };
        let resolved = resolve_env(raw, &self.env)?;
        serde_yaml::from_value(resolved).map_err(yaml_err)
    }
}

fn validate(models: &[ModelDeclaration], agents: &[AgentDeclaration]) -> Result<()> {
    let mut model_names = HashSet::new();
    for model in models {
        if !model_names.insert(model.name.as_str()) {
            return Err(ConfigError::DuplicateModelName(model.name.clone()));
        }
    }

    for agent in agents {
        if !model_names.contains(agent.model.as_str()) {
            return Err(ConfigError::UnresolvedModelReference {
                agent: agent.name.clone(),
                model: agent.model.clone(),
            });
        }
    }

    let mut agent_names = HashSet::new();
    for agent in agents {
        if !agent_names.insert(agent.name.as_str()) {
            return Err(ConfigError::DuplicateAgentName(agent.name.clone()));
        }
    }

    Ok(())
}

/// Load from `dir` using the process environment
pub fn load_config(dir: impl AsRef<Path>) -> Result<LoadedConfig> {
    ConfigLoader::new(dir.as_ref()).load()
}
