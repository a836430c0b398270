//! Tracing setup: console output plus an optional `mori.log` file.
//!
//! The level and log directory live in `config.yaml`, so loading that file
//! runs under a console-only [`bootstrap`] subscriber. [`init`] installs the
//! global one afterwards.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use mori_config::GlobalConfig;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "mori.log";

/// Map a configured level name onto a tracing filter directive
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

/// `RUST_LOG` if set, otherwise the configured level
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(level)))
}

fn console_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
}

/// Console-only subscriber for use before configuration is loaded
pub fn bootstrap() -> impl Subscriber + Send + Sync {
    console_subscriber(filter_for(&GlobalConfig::default().log_level), std::io::stdout)
}

/// `<log_dir>/mori.log`, creating the directory if needed
pub fn log_file_path(log_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(log_dir).with_context(|| format!("creating log directory {}", log_dir.display()))?;
    Ok(log_dir.join(LOG_FILE))
}

/// Install the global subscriber. `RUST_LOG` wins over `global.log_level`.
pub fn init(global: &GlobalConfig) -> anyhow::Result<()> {
    let filter = filter_for(&global.log_level);

    let file_layer = match &global.log_dir {
        Some(dir) => {
            let path = log_file_path(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("warning"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive(" debug "), "debug");
        assert_eq!(level_directive("chatty"), "info");
    }

    #[test]
    fn test_config_load_is_logged_before_init() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("config");
        fs::create_dir_all(&config).unwrap();
        fs::write(config.join("models.yaml"), "models: []\n").unwrap();
        fs::write(config.join("agents.yaml"), "agents: []\n").unwrap();

        let captured = tmp.path().join("boot.log");
        let file = fs::File::create(&captured).unwrap();
        let subscriber = console_subscriber(EnvFilter::new("debug"), Mutex::new(file));

        let loaded = tracing::subscriber::with_default(subscriber, || mori_config::load_config(&config));
        assert!(loaded.unwrap().agents().is_empty());

        let text = fs::read_to_string(&captured).unwrap();
        assert!(text.contains("loading config document"));
        assert!(text.contains("models.yaml"));
    }

    #[test]
    fn test_log_file_path_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");
        let path = log_file_path(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(path, dir.join("mori.log"));
    }
}
