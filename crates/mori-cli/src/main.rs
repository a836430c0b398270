//! mori launcher
//!
//! Loads `config.yaml`, `models.yaml` and `agents.yaml` from the config
//! directory, assembles every declared agent and reports what was built.
//!
//! ```text
//! mori [AGENT]
//! ```
//!
//! `MORI_CONFIG_DIR` selects the config directory (default `config`).
//! Variables from a `.env` file are loaded before interpolation.

mod logging;

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::{error, info, warn};

use mori_core::ToolCall;
use mori_runtime::{AgentFactory, AgentUnit};

const CONFIG_DIR_ENV: &str = "MORI_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "config";

fn report(unit: &AgentUnit) {
    let model = unit.model.model();
    info!("Agent '{}'", unit.name);
    info!("  model:     {} ({})", model.model_name, model.model_type);
    info!("  formatter: {}", unit.model.formatter().name());
    info!("  tools:     {}", unit.toolkit.names().join(", "));
    info!("  prompt:    {} chars", unit.sys_prompt.chars().count());
    if unit.parallel_tool_calls {
        info!("  parallel tool calls enabled");
    }
}

async fn smoke_test(unit: &AgentUnit) {
    match unit.toolkit.execute(&ToolCall::new("get_greeting")).await {
        Ok(response) => info!("  greeting:  {}", response.to_text()),
        Err(e) => warn!("  greeting tool failed: {e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let config_dir = std::env::var(CONFIG_DIR_ENV).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR), PathBuf::from);
    let requested = std::env::args().nth(1);

    let factory = tracing::subscriber::with_default(logging::bootstrap(), || {
        AgentFactory::from_config_dir(&config_dir)
    })
    .with_context(|| format!("loading configuration from {}", config_dir.display()))?;
    logging::init(factory.config().global())?;

    info!("══════════════════════════════════════════════════");
    info!("mori: {} model(s), {} agent(s) from {}", factory.config().models().len(), factory.config().agents().len(), config_dir.display());
    info!("══════════════════════════════════════════════════");

    if let Some(name) = requested {
        let unit = factory.build(&name)?;
        report(&unit);
        smoke_test(&unit).await;
        return Ok(());
    }

    if factory.config().agents().is_empty() {
        warn!("No agents declared in {}", config_dir.display());
        return Ok(());
    }

    let mut failed = Vec::new();
    for (name, result) in factory.build_all() {
        match result {
            Ok(unit) => {
                report(&unit);
                smoke_test(&unit).await;
            }
            Err(e) => {
                error!("Agent '{name}' failed: {e}");
                failed.push(name);
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} agent(s) failed to build: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
