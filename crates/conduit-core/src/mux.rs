//! Terminal multiplexer driver (C3).
//!
//! Operates `tmux` on behalf of the rest of the system via the
//! external-command runner. The driver holds no persistent state of its
//! own — pane status is always recomputed from `tmux list-panes` /
//! `capture-pane` output, per the observational state machine in the
//! design (`absent -> starting -> attached <-> detached -> dead`).

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::{CommandError, CommandRunner};
use crate::errors::{CoreError, CoreResult};

const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Heuristic classification of a pane's trailing output. The state set is
/// closed; implementers may extend the pattern table below but not the
/// variants here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxStatus {
    Idle,
    Running,
    Waiting,
    Error,
    Dead,
}

#[derive(Debug, Clone)]
pub struct PaneSummary {
    pub name: String,
    pub last_line: String,
}

pub struct MuxDriver<'a> {
    runner: &'a CommandRunner,
}

impl<'a> MuxDriver<'a> {
    pub fn new(runner: &'a CommandRunner) -> Self {
        Self { runner }
    }

    fn tmux(&self, project_id: Option<&str>, args: &[&str]) -> Result<String, CommandError> {
        let cwd = std::env::temp_dir();
        let out = self.runner.run(project_id, &[&["tmux"], args].concat(), &cwd, TMUX_TIMEOUT)?;
        Ok(out.stdout)
    }

    fn pane_exists(&self, project_id: Option<&str>, name: &str) -> bool {
        self.tmux(project_id, &["has-session", "-t", name]).is_ok()
    }

    /// Creates the named pane if absent; idempotent.
    pub fn create(
        &self,
        project_id: Option<&str>,
        name: &str,
        cwd: &Path,
        initial_command: Option<&str>,
    ) -> CoreResult<()> {
        if self.pane_exists(project_id, name) {
            return Ok(());
        }
        let cwd_str = cwd.to_string_lossy().to_string();
        let mut args = vec!["new-session", "-d", "-s", name, "-c", cwd_str.as_str()];
        if let Some(cmd) = initial_command {
            args.push(cmd);
        }
        self.tmux(project_id, &args)?;
        debug!(event = "core.mux.pane_created", pane = name);
        Ok(())
    }

    /// The argv the terminal gateway should run inside a PTY to attach.
    /// Attach is idempotent: if the pane does not exist, it is created
    /// with a login shell first.
    pub fn attach_command(
        &self,
        project_id: Option<&str>,
        name: &str,
        cwd: &Path,
    ) -> CoreResult<Vec<String>> {
        if !self.pane_exists(project_id, name) {
            self.create(project_id, name, cwd, None)?;
        }
        Ok(vec!["tmux".to_string(), "attach".to_string(), "-t".to_string(), name.to_string()])
    }

    /// Sends the protocol-defined detach keystroke (prefix + `d`).
    pub fn detach(&self, project_id: Option<&str>, name: &str) -> CoreResult<()> {
        self.tmux(project_id, &["detach-client", "-s", name]).ok();
        Ok(())
    }

    /// Writes bytes to the pane verbatim; does not interpret them.
    pub fn send_keys(&self, project_id: Option<&str>, name: &str, bytes: &str) -> CoreResult<()> {
        self.tmux(project_id, &["send-keys", "-t", name, "-l", bytes])?;
        Ok(())
    }

    /// Appends a newline to issue a shell-level command.
    pub fn send_command(&self, project_id: Option<&str>, name: &str, line: &str) -> CoreResult<()> {
        self.tmux(project_id, &["send-keys", "-t", name, line, "Enter"])?;
        Ok(())
    }

    /// Last N lines of the pane as text; empty (not an error) on a missing
    /// pane.
    pub fn capture(&self, project_id: Option<&str>, name: &str, tail_lines: usize) -> Vec<String> {
        if !self.pane_exists(project_id, name) {
            return Vec::new();
        }
        let start = format!("-{tail_lines}");
        match self.tmux(project_id, &["capture-pane", "-t", name, "-p", "-S", &start]) {
            Ok(output) => output.lines().map(str::to_string).collect(),
            Err(e) => {
                warn!(event = "core.mux.capture_failed", pane = name, error = %e);
                Vec::new()
            }
        }
    }

    /// Fails with `Conflict` if `new` already exists.
    pub fn rename(&self, project_id: Option<&str>, old: &str, new: &str) -> CoreResult<()> {
        if self.pane_exists(project_id, new) {
            return Err(CoreError::Conflict(format!("mux pane '{new}' already exists")));
        }
        self.tmux(project_id, &["rename-session", "-t", old, new])?;
        Ok(())
    }

    /// Enumerates pane names and their last output line.
    pub fn list(&self, project_id: Option<&str>) -> Vec<PaneSummary> {
        let names = match self.tmux(
            project_id,
            &["list-sessions", "-F", "#{session_name}"],
        ) {
            Ok(out) => out.lines().map(str::to_string).collect::<Vec<_>>(),
            Err(_) => return Vec::new(),
        };
        names
            .into_iter()
            .map(|name| {
                let last_line = self
                    .capture(project_id, &name, 1)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                PaneSummary { name, last_line }
            })
            .collect()
    }

    /// Best-effort, idempotent terminate.
    pub fn kill(&self, project_id: Option<&str>, name: &str) -> CoreResult<()> {
        self.tmux(project_id, &["kill-session", "-t", name]).ok();
        Ok(())
    }

    /// Heuristic classification from trailing lines. The pattern table is
    /// intentionally small and documented here rather than hidden in
    /// regexes scattered through callers; extend it, but keep the state
    /// set closed.
    pub fn classify_status(&self, project_id: Option<&str>, name: &str) -> MuxStatus {
        if !self.pane_exists(project_id, name) {
            return MuxStatus::Dead;
        }
        let lines = self.capture(project_id, name, 20);
        let joined = lines.join("\n");
        if joined.contains("Traceback (most recent call last)") || joined.contains("panicked at") {
            return MuxStatus::Error;
        }
        if joined.contains("[y/N]") || joined.contains("[Y/n]") || joined.contains("Do you want to proceed") {
            return MuxStatus::Waiting;
        }
        let last_non_blank = lines.iter().rev().find(|l| !l.trim().is_empty());
        match last_non_blank {
            Some(line) if line.trim_end().ends_with('$') || line.trim_end().ends_with('>') || line.trim_end().ends_with('%') => {
                MuxStatus::Idle
            }
            Some(_) => MuxStatus::Running,
            None => MuxStatus::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_missing_pane_is_dead() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let driver = MuxDriver::new(&runner);
        // `tmux` may not even be installed in the test sandbox; `has-session`
        // against a made-up name must fail either way, yielding `Dead`.
        let status = driver.classify_status(None, "conduit-test-pane-does-not-exist");
        assert_eq!(status, MuxStatus::Dead);
    }

    #[test]
    fn capture_on_missing_pane_is_empty_not_error() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let driver = MuxDriver::new(&runner);
        let lines = driver.capture(None, "conduit-test-pane-does-not-exist", 10);
        assert!(lines.is_empty());
    }
}
