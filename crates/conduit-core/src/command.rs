//! External-command runner (C2).
//!
//! Every external program conduit invokes — git, tmux, gh, dev-server
//! commands — goes through here. Argv only, never a shell string, except
//! the explicit [`run_in_shell`] escape hatch for user-authored dev-server
//! commands, which records the exception so it shows up in audits.

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("command exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("command was killed before completing")]
    Killed,

    #[error("command was cancelled")]
    Cancelled,

    #[error("I/O error running command: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Byte cap applied to captured stdout/stderr so a runaway process cannot
/// grow the runner's memory without bound.
const OUTPUT_CAP_BYTES: usize = 1024 * 1024;

/// Line cap for [`RunningCommand`]'s streamed-output ring buffer.
const LOG_RING_LINES: usize = 2000;

/// Stdout+stderr interleaved into one bounded ring, drained continuously by
/// the reader threads [`CommandRunner::spawn_streaming`] starts so the OS
/// pipe never fills and blocks the child.
#[derive(Default)]
struct LogRing {
    lines: VecDeque<String>,
}

impl LogRing {
    fn push(&mut self, line: String) {
        if self.lines.len() >= LOG_RING_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }
}

fn spawn_ring_reader(reader: impl Read + Send + 'static, ring: Arc<Mutex<LogRing>>) {
    std::thread::spawn(move || {
        let mut lines = BufReader::new(reader).lines();
        while let Some(Ok(line)) = lines.next() {
            ring.lock().unwrap_or_else(|p| p.into_inner()).push(line);
        }
    });
}

fn read_capped(mut reader: impl Read) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.by_ref().take(OUTPUT_CAP_BYTES as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Per-project-key serialization: commands tagged with a project id run
/// serially under that key (git/worktree operations against the same repo
/// must not race); commands without a key run unserialized. Grounded on
/// the inbox-file `Flock` pattern used elsewhere in this codebase, but
/// implemented as an in-process lock registry since this is per-daemon
/// process state, not cross-process.
#[derive(Default)]
pub struct CommandRunner {
    project_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    kill_grace: Duration,
}

impl CommandRunner {
    pub fn new(kill_grace: Duration) -> Self {
        Self {
            project_locks: Mutex::new(HashMap::new()),
            kill_grace,
        }
    }

    fn lock_for_project(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.project_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `argv[0] argv[1..]` in `cwd`, capturing output and enforcing
    /// `timeout`. Commands sharing `project_id` are serialized against one
    /// another; pass `None` to run unserialized.
    pub fn run(
        &self,
        project_id: Option<&str>,
        argv: &[&str],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let _guard = project_id.map(|p| self.lock_for_project(p));
        let _held = _guard.as_ref().map(|l| l.lock().unwrap_or_else(|p| p.into_inner()));
        self.run_command(argv, cwd, timeout, false)
    }

    /// Escape hatch for callers that legitimately need a shell: a
    /// user-authored dev-server command. The argument is interpolated into
    /// `sh -c`, which is the one place in conduit this happens — gated
    /// behind an explicit method name so it is visible in an audit grep.
    pub fn run_in_shell(
        &self,
        project_id: Option<&str>,
        shell_command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let _guard = project_id.map(|p| self.lock_for_project(p));
        let _held = _guard.as_ref().map(|l| l.lock().unwrap_or_else(|p| p.into_inner()));
        self.run_command(&["sh", "-c", shell_command], cwd, timeout, true)
    }

    fn run_command(
        &self,
        argv: &[&str],
        cwd: &Path,
        timeout: Duration,
        via_shell: bool,
    ) -> Result<CommandOutput, CommandError> {
        debug!(event = "core.command.started", argv = ?argv, via_shell);
        let mut child = Command::new(argv[0])
            .args(&argv[1..])
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                let stdout = read_capped(child.stdout.take().expect("piped stdout"))?;
                let stderr = read_capped(child.stderr.take().expect("piped stderr"))?;
                let code = status.code().unwrap_or(-1);
                if status.success() {
                    return Ok(CommandOutput {
                        stdout,
                        stderr,
                        exit_code: code,
                    });
                }
                return Err(CommandError::NonZeroExit {
                    code: status.code(),
                    stderr,
                });
            }
            if Instant::now() >= deadline {
                warn!(event = "core.command.timed_out", argv = ?argv, timeout = ?timeout);
                kill_with_grace(&mut child, self.kill_grace);
                return Err(CommandError::Timeout(timeout));
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Spawns a long-running process without waiting for it, returning a
    /// handle the caller can poll or [`RunningCommand::kill`]. Used by the
    /// dev-server supervisor (C7) for node-type dev servers.
    pub fn spawn_streaming(
        &self,
        argv: &[&str],
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<RunningCommand, CommandError> {
        let mut cmd = Command::new(argv[0]);
        cmd.args(&argv[1..])
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in env {
            cmd.env(k, v);
        }
        let mut child = cmd.spawn()?;
        let ring = Arc::new(Mutex::new(LogRing::default()));
        if let Some(stdout) = child.stdout.take() {
            spawn_ring_reader(stdout, ring.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_ring_reader(stderr, ring.clone());
        }
        Ok(RunningCommand {
            child,
            kill_grace: self.kill_grace,
            log_ring: ring,
        })
    }
}

/// Handle to a process started via [`CommandRunner::spawn_streaming`].
pub struct RunningCommand {
    child: Child,
    kill_grace: Duration,
    log_ring: Arc<Mutex<LogRing>>,
}

impl RunningCommand {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking check for whether the process has exited.
    pub fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(|s| s.code().unwrap_or(-1)))
    }

    /// SIGTERM, then SIGKILL after the runner's configured grace period.
    pub fn kill(&mut self) {
        kill_with_grace(&mut self.child, self.kill_grace);
    }

    /// Last `n` lines of stdout+stderr captured by the background reader
    /// threads since the process was spawned.
    pub fn tail_logs(&self, n: usize) -> Vec<String> {
        self.log_ring.lock().unwrap_or_else(|p| p.into_inner()).tail(n)
    }
}

fn kill_with_grace(child: &mut Child, grace: Duration) {
    let pid = Pid::from_raw(child.id() as i32);
    let _ = signal::kill(pid, Signal::SIGTERM);
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() >= deadline => break,
            Ok(None) => std::thread::sleep(Duration::from_millis(20)),
            Err(_) => break,
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_captures_stdout() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let out = runner
            .run(None, &["echo", "hello"], Path::new("/tmp"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn non_zero_exit_captures_stderr() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let err = runner
            .run(None, &["false"], Path::new("/tmp"), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit { .. }));
    }

    #[test]
    fn timeout_kills_slow_command() {
        let runner = CommandRunner::new(Duration::from_millis(100));
        let err = runner
            .run(None, &["sleep", "5"], Path::new("/tmp"), Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout(_)));
    }

    #[test]
    fn run_in_shell_supports_pipelines() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let out = runner
            .run_in_shell(None, "echo a && echo b", Path::new("/tmp"), Duration::from_secs(5))
            .unwrap();
        assert!(out.stdout.contains('a') && out.stdout.contains('b'));
    }

    #[test]
    fn same_project_key_shares_one_lock_instance() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let a = runner.lock_for_project("proj");
        let b = runner.lock_for_project("proj");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn spawn_streaming_drains_stdout_without_blocking() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let mut child = runner
            .spawn_streaming(
                &["sh", "-c", "for i in $(seq 1 50); do echo line-$i; done"],
                Path::new("/tmp"),
                &HashMap::new(),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while matches!(child.try_wait(), Ok(None)) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }

        let tail = child.tail_logs(10);
        assert_eq!(tail.len(), 10);
        assert_eq!(tail.last().unwrap(), "line-50");
    }
}
