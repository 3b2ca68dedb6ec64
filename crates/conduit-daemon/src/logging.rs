use std::path::PathBuf;

use conduit_paths::ConduitPaths;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured logging for the daemon process.
///
/// Logs go to `~/.conduit/logs/daemon.log` (rotated daily) rather than
/// stdout, since the daemon's stdout/stderr are usually detached once it
/// forks into the background. Verbosity is controlled by `RUST_LOG`,
/// defaulting to `info` when unset. `json` switches the file layer between
/// newline-delimited JSON (for log aggregation) and compact text.
pub fn init_logging(json: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false);

    if json {
        let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer.json());
        let _ = registry.try_init();
    } else {
        let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);
        let _ = registry.try_init();
    }

    guard
}

fn log_dir() -> PathBuf {
    ConduitPaths::resolve()
        .map(|p| p.logs_dir())
        .unwrap_or_else(|_| PathBuf::from("/tmp/.conduit/logs"))
}
