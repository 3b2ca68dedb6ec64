use tracing_subscriber::EnvFilter;

/// Initialize CLI logging. Unlike the daemon, the CLI logs to stderr and
/// exits after a single command, so there is no rotating file appender here
/// — just a compact layer gated by `RUST_LOG` (or `--verbose`).
pub fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "debug" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}
