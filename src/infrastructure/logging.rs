//! Logging system configuration and initialization
//!
//! - Console output on stderr with optional JSON formatting; stdout is left
//!   to the command output
//! - Optional daily-rolling file output through a non-blocking writer
//! - `RUST_LOG` overrides the configured level and module filters

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "catalog-refresh.log";

/// Directory used when the config does not name one
pub fn get_log_directory() -> PathBuf {
    crate::infrastructure::config::ConfigManager::get_app_data_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default().join("logs"))
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Build the filter from `RUST_LOG` or, failing that, the configured level plus module filters
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);

        if !config.level.eq_ignore_ascii_case("trace") {
            for (module, level) in &config.module_filters {
                match format!("{}={}", module, level).parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(e) => eprintln!("Ignoring invalid log filter {}={}: {}", module, level, e),
                }
            }
        }

        filter
    })
}

/// Initialize logging with custom configuration
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the process when file output is enabled.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let registry = Registry::default().with(build_env_filter(config));

    let (file_writer, guard) = if config.file_output {
        let log_dir = config.directory.clone().unwrap_or_else(get_log_directory);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        let (writer, guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    let installed = match (file_writer, config.console_output, config.json_format) {
        (Some(writer), true, true) => {
            let file_layer = fmt::Layer::new().json().with_writer(writer).with_ansi(false);
            let console_layer = fmt::Layer::new().json().with_writer(std::io::stderr);
            registry.with(file_layer).with(console_layer).try_init()
        }
        (Some(writer), true, false) => {
            let file_layer = fmt::Layer::new().with_writer(writer).with_target(false).with_ansi(false);
            let console_layer = fmt::Layer::new().with_writer(std::io::stderr).with_target(false);
            registry.with(file_layer).with(console_layer).try_init()
        }
        (Some(writer), false, true) => {
            let file_layer = fmt::Layer::new().json().with_writer(writer).with_ansi(false);
            registry.with(file_layer).try_init()
        }
        (Some(writer), false, false) => {
            let file_layer = fmt::Layer::new().with_writer(writer).with_target(false).with_ansi(false);
            registry.with(file_layer).try_init()
        }
        (None, true, true) => {
            let console_layer = fmt::Layer::new().json().with_writer(std::io::stderr);
            registry.with(console_layer).try_init()
        }
        (None, true, false) => {
            let console_layer = fmt::Layer::new().with_writer(std::io::stderr).with_target(false);
            registry.with(console_layer).try_init()
        }
        (None, false, _) => return Err(anyhow!("No logging output configured")),
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!(
        level = %config.level,
        json = config.json_format,
        file_output = config.file_output,
        "Logging system initialized"
    );

    Ok(guard)
}
