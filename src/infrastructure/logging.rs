//! Logging system configuration and initialization
//!
//! Console and file logging via `tracing`. The file layer writes
//! `logs/crawler.log` through a non-blocking appender whose guard is kept
//! alive for the process lifetime. `RUST_LOG` overrides the configured level.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive until process exit.
static LOG_GUARDS: Lazy<Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

const LOG_FILE_NAME: &str = "crawler.log";

/// Log directory next to the current working directory.
pub fn get_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

/// Initialize logging with the given configuration.
///
/// Noisy dependency targets (`reqwest`, `hyper`) are capped below the
/// application level unless TRACE is requested or `RUST_LOG` says otherwise.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);
        if !config.level.eq_ignore_ascii_case("trace") {
            filter = filter
                .add_directive("reqwest=info".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("hyper_util=warn".parse().unwrap());
        }
        filter
    });

    let registry = Registry::default().with(env_filter);

    match (config.file_output, config.console_output) {
        (true, true) => {
            let (file_writer, guard) = file_writer()?;
            LOG_GUARDS.lock().unwrap().push(guard);

            let file_layer = fmt::Layer::new()
                .with_writer(file_writer)
                .with_target(false)
                .with_ansi(false);
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_target(false);
            registry.with(file_layer).with(console_layer).init();
        }
        (true, false) => {
            let (file_writer, guard) = file_writer()?;
            LOG_GUARDS.lock().unwrap().push(guard);

            let file_layer = fmt::Layer::new()
                .with_writer(file_writer)
                .with_target(false)
                .with_ansi(false);
            registry.with(file_layer).init();
        }
        (false, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_target(false);
            registry.with(console_layer).init();
        }
        (false, false) => return Err(anyhow!("no logging output configured")),
    }

    info!("Logging system initialized (level: {})", config.level);
    Ok(())
}

fn file_writer() -> Result<(
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
)> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow!("failed to create log directory {:?}: {}", log_dir, e))?;
    let appender = rolling::never(&log_dir, LOG_FILE_NAME);
    Ok(non_blocking(appender))
}

/// Log basic system information for diagnostics.
pub fn log_system_info() {
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
