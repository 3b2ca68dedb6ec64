use std::error::Error;
use std::process::Stdio;
use std::time::{Duration, Instant};

use conduit_config::Config;
use conduit_core::CommandRunner;
use conduit_paths::ConduitPaths;
use conduit_protocol::client::IpcConnection;
use conduit_protocol::{ClientMessage, DaemonMessage};
use conduit_store::Store;
use tracing::warn;

use crate::color;

/// Everything a command handler needs to talk to the rest of the system.
/// Built fresh for each CLI invocation — the process handles exactly one
/// command and exits.
pub struct Harness {
    pub store: Store,
    pub config: Config,
    pub paths: ConduitPaths,
    pub runner: CommandRunner,
}

pub fn build_harness() -> Result<Harness, Box<dyn Error>> {
    let paths = ConduitPaths::resolve()?;
    std::fs::create_dir_all(paths.conduit_dir())?;
    let config = load_config_with_warning();
    let store = Store::open(&paths.store_db())?;
    let runner = CommandRunner::new(Duration::from_millis(config.daemon.kill_grace_ms));
    Ok(Harness { store, config, paths, runner })
}

/// Load the merged user/project config, falling back to defaults on any
/// load error rather than failing the whole command — a malformed config
/// file should not stop `conduit list` from working.
pub fn load_config_with_warning() -> Config {
    match Config::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                color::warning(&format!(
                    "Warning: Could not load config: {}. Using defaults.\n\
                     Tip: Check ~/.conduit/config.toml and ./.conduit/config.toml for syntax errors.",
                    e
                ))
            );
            warn!(event = "cli.config.load_failed", error = %e, "Config load failed, using defaults");
            Config::default()
        }
    }
}

/// Guards session/branch-name input before it reaches a shell-invoking
/// layer (tmux, git). Rejects path traversal, absolute paths, trailing
/// slashes and anything that isn't alphanumeric/`-`/`_`/`/`.
pub fn is_valid_branch_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.starts_with('/')
        && !name.ends_with('/')
        && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
        && name.len() <= 255
}

/// One-shot ping against the daemon's Unix socket. `false` covers both "no
/// socket" and "socket present but nothing answering" — both mean the
/// caller should (re)start it.
pub fn ping_daemon(paths: &ConduitPaths) -> bool {
    let Ok(mut conn) = IpcConnection::connect(&paths.daemon_socket()) else {
        return false;
    };
    matches!(
        conn.request(&ClientMessage::Ping { id: "cli-ping".to_string() }),
        Ok(DaemonMessage::Ack { .. })
    )
}

/// Ensure the daemon is reachable, starting it in the background if not.
/// There is no config toggle for this (unlike agent auto-start) — any
/// command that needs to attach to a pane needs the daemon, so starting it
/// on demand is always correct.
pub fn ensure_daemon_running(paths: &ConduitPaths) -> Result<(), Box<dyn Error>> {
    if ping_daemon(paths) {
        return Ok(());
    }

    eprintln!("{}", color::muted("Daemon not running, starting it..."));
    spawn_daemon_detached()?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if paths.daemon_socket().exists() && ping_daemon(paths) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Err("daemon did not come up within 5s".into())
}

fn spawn_daemon_detached() -> Result<(), Box<dyn Error>> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or("could not determine conduit's install directory")?;
    std::process::Command::new(dir.join("conduit-daemon"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

/// Resolve a user-supplied id-or-name argument to a full session row.
/// Sessions are addressed by id everywhere in the store, but users type
/// names — this is the one place that bridges the two.
pub fn resolve_session(
    store: &Store,
    id_or_name: &str,
) -> Result<conduit_store::Session, Box<dyn Error>> {
    store
        .list_sessions(None)?
        .into_iter()
        .find(|s| s.id == id_or_name || s.name == id_or_name)
        .ok_or_else(|| format!("no session matching '{}'", id_or_name).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_branch_names_pass() {
        assert!(is_valid_branch_name("feature/add-login"));
        assert!(is_valid_branch_name("fix_bug-123"));
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        assert!(!is_valid_branch_name("../escape"));
        assert!(!is_valid_branch_name("/etc/passwd"));
        assert!(!is_valid_branch_name("trailing/"));
        assert!(!is_valid_branch_name(""));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(!is_valid_branch_name("name; rm -rf /"));
        assert!(!is_valid_branch_name("name`whoami`"));
        assert!(!is_valid_branch_name("name $(whoami)"));
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(256);
        assert!(!is_valid_branch_name(&name));
        let name = "a".repeat(255);
        assert!(is_valid_branch_name(&name));
    }
}
