//! Logging setup
//!
//! Domain code logs through the `log` macros; everything is routed into a
//! `tracing` registry with two layers:
//! - JSON lines in a daily rolling file under the log directory
//! - pretty human-readable output on stdout
//!
//! `RUST_LOG` overrides the default `info` filter.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "character-forge.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging. Keep the returned guard alive for the lifetime of
/// the process or buffered file output is lost.
pub fn init(log_dir: &Path) -> WorkerGuard {
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(env_filter());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .pretty()
        .with_filter(env_filter());

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
    {
        eprintln!("Failed to initialize tracing subscriber: {}", e);
    }

    // Already installed when the subscriber's own log bridge is enabled.
    if let Err(e) = tracing_log::LogTracer::init() {
        log::debug!("LogTracer not installed: {}", e);
    }

    log::info!(
        "Logging initialized, writing to {}",
        log_dir.join(LOG_FILE_PREFIX).display()
    );

    guard
}
