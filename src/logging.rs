//! Tracing configuration and log routing.
//!
//! The HTTP server logs to stdout with a compact formatter and mirrors every event into a file.
//! When `RUSTY_CLASSIFY_LOG_FILE` is set, logs are appended to that path; otherwise the file
//! lives at `logs/rusty-classify.log`. The command-line classifier writes its JSON report to
//! stdout, so it routes logs to stderr and skips the file layer entirely.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where console output of the tracing subscriber is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// Long-running server: stdout plus a non‑blocking file layer.
    Server,
    /// One-shot CLI run: stderr only, keeping stdout free for results.
    Cli,
}

/// Configure tracing subscribers for the server process.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Uses a global guard to keep the non‑blocking writer alive for the process lifetime.
pub fn init_tracing() {
    init_tracing_for(LogTarget::Server);
}

/// Configure tracing subscribers for the given process flavour.
pub fn init_tracing_for(target: LogTarget) {
    let default_level = match target {
        LogTarget::Server => "info",
        LogTarget::Cli => "warn",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if target == LogTarget::Cli {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .init();
        return;
    }

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact());

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when the logs directory cannot be created or the target file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    if let Ok(path) = std::env::var("RUSTY_CLASSIFY_LOG_FILE") {
        return match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => Some(install_guard(tracing_appender::non_blocking(file))),
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                None
            }
        };
    }

    if let Err(err) = std::fs::create_dir_all("logs") {
        eprintln!("Failed to create logs directory: {err}");
        return None;
    }
    let file_appender = tracing_appender::rolling::never("logs", "rusty-classify.log");
    Some(install_guard(tracing_appender::non_blocking(file_appender)))
}

fn install_guard((writer, guard): (NonBlocking, WorkerGuard)) -> NonBlocking {
    let _ = LOG_GUARD.set(guard);
    writer
}
