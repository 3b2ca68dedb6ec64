use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use conduit_protocol::{PaneName, PtyInfo, PtyStatus};
use tokio::sync::broadcast;
use tracing::error;

use crate::pty::output::ScrollbackBuffer;

/// Unique identifier for a connected client (one per accepted TCP/Unix
/// connection that has attached, not one per daemon connection overall).
pub type ClientId = u64;

/// A pane managed by the daemon, combining bookkeeping with PTY runtime
/// state. The daemon knows about commands and working directories, not
/// about git branches, worktrees or agents — those concepts live entirely
/// in `conduit-core`; the daemon just owns the terminal.
pub struct DaemonPane {
    pane: PaneName,
    working_directory: String,
    command: String,
    created_at: String,
    status: PtyStatus,
    /// Broadcast sender for PTY output distribution to attached clients.
    /// Only present while `Running`.
    output_tx: Option<broadcast::Sender<Vec<u8>>>,
    /// Ring buffer of recent PTY output, shared with the reader task so it
    /// can feed output in as it arrives.
    scrollback: Arc<Mutex<ScrollbackBuffer>>,
    attached_clients: HashSet<ClientId>,
    pty_pid: Option<u32>,
    exit_code: Option<i32>,
}

impl DaemonPane {
    /// Create a new pane, initially in the `Starting` state.
    pub fn new(
        pane: PaneName,
        working_directory: String,
        command: String,
        created_at: String,
        scrollback_capacity: usize,
    ) -> Self {
        Self {
            pane,
            working_directory,
            command,
            created_at,
            status: PtyStatus::Starting,
            output_tx: None,
            scrollback: Arc::new(Mutex::new(ScrollbackBuffer::new(scrollback_capacity))),
            attached_clients: HashSet::new(),
            pty_pid: None,
            exit_code: None,
        }
    }

    pub fn pane(&self) -> &PaneName {
        &self.pane
    }

    pub fn status(&self) -> PtyStatus {
        self.status
    }

    pub fn pty_pid(&self) -> Option<u32> {
        self.pty_pid
    }

    pub fn has_output(&self) -> bool {
        self.output_tx.is_some()
    }

    pub fn output_tx(&self) -> Option<broadcast::Sender<Vec<u8>>> {
        self.output_tx.clone()
    }

    /// Transition to `Running` with a broadcast sender for PTY output.
    pub fn set_running(&mut self, output_tx: broadcast::Sender<Vec<u8>>, pty_pid: Option<u32>) {
        debug_assert!(
            matches!(self.status, PtyStatus::Starting),
            "set_running called on non-Starting pane (status: {:?})",
            self.status
        );
        self.status = PtyStatus::Running;
        self.output_tx = Some(output_tx);
        self.pty_pid = pty_pid;
    }

    /// Transition to `Stopped`, clearing PTY resources. Idempotent.
    pub fn set_stopped(&mut self, exit_code: Option<i32>) {
        if self.status == PtyStatus::Stopped {
            return;
        }
        self.status = PtyStatus::Stopped;
        self.output_tx = None;
        self.pty_pid = None;
        self.exit_code = exit_code;
    }

    pub fn attach_client(&mut self, client_id: ClientId) {
        self.attached_clients.insert(client_id);
    }

    pub fn detach_client(&mut self, client_id: ClientId) {
        self.attached_clients.remove(&client_id);
    }

    pub fn client_count(&self) -> usize {
        self.attached_clients.len()
    }

    pub fn subscribe_output(&self) -> Option<broadcast::Receiver<Vec<u8>>> {
        self.output_tx.as_ref().map(|tx| tx.subscribe())
    }

    pub fn scrollback_contents(&self) -> Vec<u8> {
        match self.scrollback.lock() {
            Ok(sb) => sb.contents(),
            Err(poisoned) => {
                error!(event = "daemon.pane.scrollback_lock_poisoned", pane = %self.pane);
                poisoned.into_inner().contents()
            }
        }
    }

    pub fn shared_scrollback(&self) -> Arc<Mutex<ScrollbackBuffer>> {
        self.scrollback.clone()
    }

    /// Convert to the wire-level `PtyInfo`.
    pub fn to_pty_info(&self) -> PtyInfo {
        PtyInfo {
            pane: self.pane.clone(),
            working_directory: self.working_directory.clone(),
            command: self.command.clone(),
            status: self.status,
            created_at: self.created_at.clone(),
            client_count: Some(self.client_count()),
            pid: self.pty_pid,
            exit_code: self.exit_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pane() -> DaemonPane {
        DaemonPane::new(
            PaneName::new("claude-sess1"),
            "/tmp/wt".to_string(),
            "tmux attach -t claude-sess1".to_string(),
            "2026-02-09T14:30:00Z".to_string(),
            1024,
        )
    }

    #[test]
    fn test_new_pane_starts_starting() {
        let pane = test_pane();
        assert_eq!(pane.status(), PtyStatus::Starting);
        assert!(!pane.has_output());
        assert_eq!(pane.client_count(), 0);
        assert!(pane.pty_pid().is_none());
    }

    #[test]
    fn test_set_running() {
        let mut pane = test_pane();
        let (tx, _) = broadcast::channel(16);
        pane.set_running(tx, Some(12345));
        assert_eq!(pane.status(), PtyStatus::Running);
        assert!(pane.has_output());
        assert_eq!(pane.pty_pid(), Some(12345));
    }

    #[test]
    fn test_set_stopped() {
        let mut pane = test_pane();
        let (tx, _) = broadcast::channel(16);
        pane.set_running(tx, Some(12345));
        pane.set_stopped(Some(0));
        assert_eq!(pane.status(), PtyStatus::Stopped);
        assert!(!pane.has_output());
        assert!(pane.pty_pid().is_none());
    }

    #[test]
    fn test_client_tracking() {
        let mut pane = test_pane();
        assert_eq!(pane.client_count(), 0);

        pane.attach_client(1);
        assert_eq!(pane.client_count(), 1);

        pane.attach_client(2);
        assert_eq!(pane.client_count(), 2);

        pane.attach_client(1);
        assert_eq!(pane.client_count(), 2);

        pane.detach_client(1);
        assert_eq!(pane.client_count(), 1);

        pane.detach_client(2);
        assert_eq!(pane.client_count(), 0);
    }

    #[test]
    fn test_subscribe_output_when_running() {
        let mut pane = test_pane();
        assert!(pane.subscribe_output().is_none());

        let (tx, _) = broadcast::channel(16);
        pane.set_running(tx, None);
        assert!(pane.subscribe_output().is_some());
    }

    #[test]
    fn test_scrollback_empty_initially() {
        let pane = test_pane();
        assert!(pane.scrollback_contents().is_empty());
    }

    #[test]
    fn test_to_pty_info() {
        let mut pane = test_pane();
        pane.attach_client(1);
        pane.attach_client(2);

        let info = pane.to_pty_info();
        assert_eq!(info.pane, PaneName::new("claude-sess1"));
        assert_eq!(info.working_directory, "/tmp/wt");
        assert_eq!(info.command, "tmux attach -t claude-sess1");
        assert_eq!(info.status, PtyStatus::Starting);
        assert_eq!(info.client_count, Some(2));
    }
}
