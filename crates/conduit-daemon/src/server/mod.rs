pub mod shutdown;

use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::connection;
use crate::errors::DaemonError;
use crate::pane::manager::PaneManager;
use crate::pid;

/// Run the daemon server.
///
/// This is the entrypoint called by `conduit daemon start`. It:
/// 1. Checks for an existing daemon (PID file)
/// 2. Writes a PID file
/// 3. Binds a Unix socket
/// 4. Accepts client connections in a loop
/// 5. Handles graceful shutdown on SIGTERM/SIGINT or a client `daemon_stop`
pub async fn run_server(config: DaemonConfig) -> Result<(), DaemonError> {
    let pid_path = config.pid_path.clone();
    let socket_path = config.socket_path.clone();

    if let Some(existing_pid) = pid::check_daemon_running(&pid_path) {
        return Err(DaemonError::AlreadyRunning(existing_pid));
    }

    pid::write_pid_file(&pid_path)?;

    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(&socket_path)?;

    info!(
        event = "daemon.server.started",
        pid = std::process::id(),
        socket = %socket_path.display(),
    );

    let (pty_exit_tx, mut pty_exit_rx) = tokio::sync::mpsc::unbounded_channel();

    let panes = Arc::new(RwLock::new(PaneManager::new(config.clone(), pty_exit_tx)));
    let shutdown = CancellationToken::new();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown::wait_for_shutdown_signal(signal_shutdown).await;
    });

    loop {
        tokio::select! {
            accept = listener.accept() => {
                match accept {
                    Ok((stream, _addr)) => {
                        let panes = panes.clone();
                        let shutdown_token = shutdown.clone();
                        tokio::spawn(connection::handle_connection(stream, panes, shutdown_token));
                    }
                    Err(e) => {
                        error!(event = "daemon.server.accept_failed", error = %e);
                    }
                }
            }
            Some(exit_event) = pty_exit_rx.recv() => {
                let pane = conduit_protocol::PaneName::new(exit_event.pane);
                let mut mgr = panes.write().await;
                if let Some(output_tx) = mgr.handle_pty_exit(&pane) {
                    // Dropping the sender makes every forward_output task see
                    // RecvError::Closed and exit its streaming loop.
                    drop(output_tx);
                }
            }
            _ = shutdown.cancelled() => {
                info!(event = "daemon.server.shutdown_started");
                break;
            }
        }
    }

    {
        let mut mgr = panes.write().await;
        mgr.stop_all();
    }

    cleanup(&pid_path, &socket_path);

    info!(event = "daemon.server.shutdown_completed");

    Ok(())
}

fn cleanup(pid_path: &Path, socket_path: &Path) {
    if let Err(e) = pid::remove_pid_file(pid_path) {
        error!(event = "daemon.server.pid_cleanup_failed", error = %e);
    }
    if socket_path.exists()
        && let Err(e) = std::fs::remove_file(socket_path)
    {
        error!(event = "daemon.server.socket_cleanup_failed", error = %e);
    }
}
