//! Prompt Templates
//!
//! Two-tier lookup (override directory, then built-in templates) and
//! rendering with a context merged from defaults, the runtime clock and the
//! agent's own variables.
//!
//! Templates use Jinja2-style syntax (`{{ var }}`, `{% if %}`, `{% for %}`,
//! `{# comment #}`) rendered by `tera`. Referencing an undefined variable is
//! an error.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use serde_json::{Map, Value};
use tracing::debug;

use mori_config::{Params, TemplateSettings};

use crate::error::{Result, RuntimeError};

/// File extension of template files, without the dot
pub const TEMPLATE_EXTENSION: &str = "jinja2";

/// Templates compiled into the binary, by bare name
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("assistant", include_str!("../templates/assistant.jinja2")),
    ("mori", include_str!("../templates/mori.jinja2")),
];

/// Source of a shipped template
pub fn builtin_template(name: &str) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, source)| *source)
}

/// Names of the shipped templates
pub fn builtin_template_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_TEMPLATES.iter().map(|(name, _)| *name)
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Frozen at a local date and time; `None` if that time does not exist
    /// (e.g. skipped by a DST change)
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Local
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Values injected into every render
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeContext(Map<String, Value>);

impl RuntimeContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Snapshot the clock into template variables. Call per render.
pub fn build_runtime_context(clock: &dyn Clock) -> RuntimeContext {
    let now = clock.now();
    let mut map = Map::new();
    map.insert("current_time".into(), Value::String(now.format("%H:%M:%S").to_string()));
    map.insert("current_date".into(), Value::String(now.format("%Y-%m-%d %A").to_string()));
    RuntimeContext(map)
}

/// Ordered lookup locations; earlier wins
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSource {
    pub override_dir: PathBuf,

    /// `None` selects the templates compiled into the binary
    pub builtin_dir: Option<PathBuf>,
}

impl TemplateSource {
    /// Override directory in front of the shipped templates
    pub fn new(override_dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: override_dir.into(),
            builtin_dir: None,
        }
    }

    /// Replace the shipped templates with a directory
    #[must_use]
    pub fn with_builtin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.builtin_dir = Some(dir.into());
        self
    }
}

impl From<&TemplateSettings> for TemplateSource {
    fn from(settings: &TemplateSettings) -> Self {
        Self {
            override_dir: settings.override_dir.clone(),
            builtin_dir: settings.builtin_dir.clone(),
        }
    }
}

/// Where a resolved template lives
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedTemplate {
    File(PathBuf),
    Builtin { name: &'static str, source: &'static str },
}

impl ResolvedTemplate {
    /// Path for logs and errors; shipped templates show as `builtin:<file>`
    pub fn path(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Builtin { name, .. } => PathBuf::from(format!("builtin:{name}.{TEMPLATE_EXTENSION}")),
        }
    }

    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin { .. })
    }

    fn load(&self) -> std::io::Result<Cow<'static, str>> {
        match self {
            Self::File(path) => std::fs::read_to_string(path).map(Cow::Owned),
            Self::Builtin { source, .. } => Ok(Cow::Borrowed(source)),
        }
    }
}

impl From<PathBuf> for ResolvedTemplate {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// A name with a path separator or the template extension is used as a path
fn is_qualified(name: &str) -> bool {
    name.contains('/') || name.contains('\\') || name.ends_with(&format!(".{TEMPLATE_EXTENSION}"))
}

/// Flatten an error and its sources into one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Finds and renders prompt templates
#[derive(Clone)]
pub struct TemplateResolver {
    source: TemplateSource,
    defaults: Params,
    clock: Arc<dyn Clock>,
}

impl TemplateResolver {
    pub fn new(source: TemplateSource) -> Self {
        let mut defaults = Params::new();
        defaults.insert("mori_version".into(), Value::String(env!("CARGO_PKG_VERSION").into()));
        Self {
            source,
            defaults,
            clock: Arc::new(SystemClock),
        }
    }

    /// Resolver configured from the global template settings
    pub fn from_settings(settings: &TemplateSettings) -> Self {
        let mut resolver = Self::new(TemplateSource::from(settings));
        resolver.defaults.extend(settings.variables.clone());
        resolver
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    pub const fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Locate a template.
    ///
    /// Bare names are probed as `<name>.jinja2` in the override directory,
    /// then in the built-in tier. Qualified names are used as given.
    pub fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        if is_qualified(name) {
            let path = PathBuf::from(name);
            debug!(template = name, "qualified template name, skipping lookup tiers");
            return if path.is_file() {
                Ok(ResolvedTemplate::File(path))
            } else {
                Err(RuntimeError::TemplateNotFound(name.to_string()))
            };
        }

        let file_name = format!("{name}.{TEMPLATE_EXTENSION}");
        let overridden = self.source.override_dir.join(&file_name);
        debug!(path = %overridden.display(), "probing template");
        if overridden.is_file() {
            return Ok(ResolvedTemplate::File(overridden));
        }

        match &self.source.builtin_dir {
            Some(dir) => {
                let candidate = dir.join(&file_name);
                debug!(path = %candidate.display(), "probing template");
                if candidate.is_file() {
                    return Ok(ResolvedTemplate::File(candidate));
                }
            }
            None => {
                if let Some(&(builtin, source)) = BUILTIN_TEMPLATES.iter().find(|(builtin, _)| *builtin == name) {
                    return Ok(ResolvedTemplate::Builtin { name: builtin, source });
                }
            }
        }

        Err(RuntimeError::TemplateNotFound(name.to_string()))
    }

    /// Render with a fresh runtime context
    pub fn render(&self, template: &ResolvedTemplate, agent_vars: &Params) -> Result<String> {
        let ctx = build_runtime_context(self.clock.as_ref());
        self.render_with_context(template, &ctx, agent_vars)
    }

    /// Render against an explicit runtime context
    pub fn render_with_context(
        &self,
        template: &ResolvedTemplate,
        runtime: &RuntimeContext,
        agent_vars: &Params,
    ) -> Result<String> {
        let source = template.load().map_err(|e| RuntimeError::TemplateRenderError {
            path: template.path(),
            cause: error_chain(&e),
        })?;
        self.render_source(&source, runtime, agent_vars)
            .map_err(|cause| RuntimeError::TemplateRenderError {
                path: template.path(),
                cause,
            })
    }

    /// Resolve a name and render it
    pub fn resolve_and_render(&self, name: &str, agent_vars: &Params) -> Result<String> {
        let template = self.resolve(name)?;
        self.render(&template, agent_vars)
    }

    /// Render an inline template string
    pub fn render_string(&self, template: &str, agent_vars: &Params) -> Result<String> {
        let ctx = build_runtime_context(self.clock.as_ref());
        self.render_source(template, &ctx, agent_vars)
            .map_err(|cause| RuntimeError::TemplateRenderError {
                path: PathBuf::from("<inline>"),
                cause,
            })
    }

    /// Defaults, then runtime values, then agent variables
    fn merged_context(&self, runtime: &RuntimeContext, agent_vars: &Params) -> tera::Context {
        let mut ctx = tera::Context::new();
        for (key, value) in &self.defaults {
            ctx.insert(key.as_str(), value);
        }
        for (key, value) in &runtime.0 {
            ctx.insert(key.as_str(), value);
        }
        for (key, value) in agent_vars {
            ctx.insert(key.as_str(), value);
        }
        ctx
    }

    fn render_source(&self, source: &str, runtime: &RuntimeContext, agent_vars: &Params) -> std::result::Result<String, String> {
        let ctx = self.merged_context(runtime, agent_vars);
        tera::Tera::one_off(source, &ctx, false).map_err(|e| error_chain(&e))
    }
}

impl std::fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateResolver")
            .field("source", &self.source)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
