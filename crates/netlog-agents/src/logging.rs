//! Logging setup: stderr plus a log file.
//!
//! Call [init_logger] once at the start of `main` and keep the returned guard
//! alive until exit so buffered file output is flushed.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "netlog.log";

/// Initializes logging to stderr and `{dir}/netlog.log`.
///
/// `dir` defaults to `$XDG_DATA_HOME/netlog`, then `~/.local/share/netlog`,
/// then the current directory. Default level is
/// `netlog_agents=info,langgraph=info` (`debug` with `verbose`) when
/// `RUST_LOG` is not set. Returns `None` when the log directory cannot be
/// created; stderr logging is still installed.
pub fn init_logger(log_dir: Option<PathBuf>, verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "netlog_agents={default_level},netlog={default_level},langgraph={default_level}"
        ))
    });
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let dir = log_dir.unwrap_or_else(default_log_dir);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("netlog: failed to create log dir {}: {}", dir.display(), e);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();
    Some(guard)
}

fn default_log_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        .map(|p| p.join("netlog"))
        .unwrap_or_else(|_| PathBuf::from("."))
}
