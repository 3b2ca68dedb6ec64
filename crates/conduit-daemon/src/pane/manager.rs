use std::collections::HashMap;

use conduit_protocol::{PaneName, PtyInfo};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::errors::DaemonError;
use crate::pane::state::{ClientId, DaemonPane};
use crate::pty::manager::PtyManager;
use crate::pty::output::{PtyExitEvent, spawn_pty_reader};

/// Orchestrates pane lifecycle within the daemon: the map of `DaemonPane`
/// bookkeeping, the `PtyManager` doing the actual PTY allocation, and
/// per-connection client attach/detach tracking.
pub struct PaneManager {
    panes: HashMap<PaneName, DaemonPane>,
    pty_manager: PtyManager,
    config: DaemonConfig,
    next_client_id: ClientId,
    pty_exit_tx: tokio::sync::mpsc::UnboundedSender<PtyExitEvent>,
}

impl PaneManager {
    pub fn new(config: DaemonConfig, pty_exit_tx: tokio::sync::mpsc::UnboundedSender<PtyExitEvent>) -> Self {
        Self {
            panes: HashMap::new(),
            pty_manager: PtyManager::new(),
            config,
            next_client_id: 1,
            pty_exit_tx,
        }
    }

    pub fn next_client_id(&mut self) -> ClientId {
        let id = self.next_client_id;
        self.next_client_id += 1;
        id
    }

    /// Create a new pane with a PTY, spawn the command, and wire up output
    /// broadcasting.
    #[allow(clippy::too_many_arguments)]
    pub fn create_pane(
        &mut self,
        pane: &PaneName,
        working_directory: &str,
        command: &str,
        args: &[String],
        env_vars: &HashMap<String, String>,
        rows: u16,
        cols: u16,
    ) -> Result<PtyInfo, DaemonError> {
        if self.panes.contains_key(pane) {
            return Err(DaemonError::PaneAlreadyExists(pane.to_string()));
        }

        info!(event = "daemon.pane.create_started", pane = %pane, command = command);

        let created_at = chrono::Utc::now().to_rfc3339();

        let mut daemon_pane = DaemonPane::new(
            pane.clone(),
            working_directory.to_string(),
            command.to_string(),
            created_at,
            self.config.scrollback_buffer_size,
        );

        let working_dir = std::path::Path::new(working_directory);
        let managed_pty = self
            .pty_manager
            .create(pane.as_ref(), command, args, working_dir, rows, cols, env_vars)?;

        let pty_pid = managed_pty.child_process_id();
        let reader = managed_pty.try_clone_reader()?;

        let (output_tx, _) = broadcast::channel(self.config.broadcast_capacity);
        let reader_tx = output_tx.clone();
        let shared_scrollback = daemon_pane.shared_scrollback();

        spawn_pty_reader(
            pane.to_string(),
            reader,
            reader_tx,
            shared_scrollback,
            Some(self.pty_exit_tx.clone()),
        );

        daemon_pane.set_running(output_tx, pty_pid);

        let info = daemon_pane.to_pty_info();
        self.panes.insert(pane.clone(), daemon_pane);

        info!(event = "daemon.pane.create_completed", pane = %pane, pid = ?pty_pid);

        Ok(info)
    }

    /// Attach a client to a pane. Returns a broadcast receiver for PTY
    /// output and the scrollback contents to replay first.
    pub fn attach_client(
        &mut self,
        pane: &PaneName,
        client_id: ClientId,
    ) -> Result<(broadcast::Receiver<Vec<u8>>, Vec<u8>), DaemonError> {
        let daemon_pane = self
            .panes
            .get_mut(pane)
            .ok_or_else(|| DaemonError::PaneNotFound(pane.to_string()))?;

        if daemon_pane.status() != conduit_protocol::PtyStatus::Running {
            return Err(DaemonError::PaneNotRunning(pane.to_string()));
        }

        daemon_pane.attach_client(client_id);

        let rx = daemon_pane
            .subscribe_output()
            .ok_or_else(|| DaemonError::PtyError("no output channel available".to_string()))?;
        let scrollback = daemon_pane.scrollback_contents();

        debug!(
            event = "daemon.pane.client_attached",
            pane = %pane,
            client_id = client_id,
            client_count = daemon_pane.client_count(),
        );

        Ok((rx, scrollback))
    }

    pub fn detach_client(&mut self, pane: &PaneName, client_id: ClientId) -> Result<(), DaemonError> {
        let daemon_pane = self
            .panes
            .get_mut(pane)
            .ok_or_else(|| DaemonError::PaneNotFound(pane.to_string()))?;

        daemon_pane.detach_client(client_id);

        debug!(
            event = "daemon.pane.client_detached",
            pane = %pane,
            client_id = client_id,
            client_count = daemon_pane.client_count(),
        );

        Ok(())
    }

    pub fn resize_pty(&mut self, pane: &PaneName, rows: u16, cols: u16) -> Result<(), DaemonError> {
        let pty = self
            .pty_manager
            .get_mut(pane.as_ref())
            .ok_or_else(|| DaemonError::PaneNotFound(pane.to_string()))?;
        pty.resize(rows, cols)
    }

    pub fn write_stdin(&self, pane: &PaneName, data: &[u8]) -> Result<(), DaemonError> {
        let pty = self
            .pty_manager
            .get(pane.as_ref())
            .ok_or_else(|| DaemonError::PaneNotFound(pane.to_string()))?;
        pty.write_stdin(data)
    }

    /// Stop a pane's process without removing its bookkeeping row.
    pub fn stop_pane(&mut self, pane: &PaneName) -> Result<(), DaemonError> {
        info!(event = "daemon.pane.stop_started", pane = %pane);

        self.pty_manager.destroy(pane.as_ref())?;

        if let Some(daemon_pane) = self.panes.get_mut(pane) {
            daemon_pane.set_stopped(None);
        }

        info!(event = "daemon.pane.stop_completed", pane = %pane);
        Ok(())
    }

    /// Destroy a pane entirely: kill the PTY (if any) and drop bookkeeping.
    /// With `force`, a missing PTY is not an error.
    pub fn destroy_pane(&mut self, pane: &PaneName, force: bool) -> Result<(), DaemonError> {
        info!(event = "daemon.pane.destroy_started", pane = %pane, force = force);

        if self.pty_manager.get(pane.as_ref()).is_some() {
            if let Err(e) = self.pty_manager.destroy(pane.as_ref()) {
                warn!(event = "daemon.pane.destroy_pty_failed", pane = %pane, error = %e);
            }
        } else if !force && !self.panes.contains_key(pane) {
            return Err(DaemonError::PaneNotFound(pane.to_string()));
        }

        self.panes.remove(pane);

        info!(event = "daemon.pane.destroy_completed", pane = %pane);
        Ok(())
    }

    pub fn get_pane(&self, pane: &PaneName) -> Option<PtyInfo> {
        self.panes.get(pane).map(|p| p.to_pty_info())
    }

    pub fn list_panes(&self) -> Vec<PtyInfo> {
        self.panes.values().map(|p| p.to_pty_info()).collect()
    }

    pub fn scrollback_contents(&self, pane: &PaneName) -> Option<Vec<u8>> {
        self.panes.get(pane).map(|p| p.scrollback_contents())
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    pub fn active_pty_count(&self) -> usize {
        self.pty_manager.count()
    }

    /// Detach a client from every pane (called when a connection closes).
    pub fn detach_client_from_all(&mut self, client_id: ClientId) {
        for pane in self.panes.values_mut() {
            pane.detach_client(client_id);
        }
    }

    /// Handle a PTY exit event: transition the pane to `Stopped` and clean
    /// up the PTY. Returns the output sender if the pane had one, so the
    /// caller can drop it and let streaming tasks observe `RecvError::Closed`.
    pub fn handle_pty_exit(&mut self, pane: &PaneName) -> Option<broadcast::Sender<Vec<u8>>> {
        info!(event = "daemon.pane.pty_exited", pane = %pane);

        let _ = self.pty_manager.remove(pane.as_ref());

        if let Some(daemon_pane) = self.panes.get_mut(pane) {
            let output_tx = daemon_pane.output_tx();
            daemon_pane.set_stopped(None);
            return output_tx;
        }
        None
    }

    /// Stop every running pane (called during graceful shutdown).
    pub fn stop_all(&mut self) {
        let pane_names: Vec<PaneName> = self
            .panes
            .values()
            .filter(|p| p.status() == conduit_protocol::PtyStatus::Running)
            .map(|p| p.pane().clone())
            .collect();

        for pane in pane_names {
            if let Err(e) = self.stop_pane(&pane) {
                warn!(event = "daemon.pane.stop_failed", pane = %pane, error = %e);
            }
        }
    }
}
