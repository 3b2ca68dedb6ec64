use std::path::PathBuf;

use conduit_paths::ConduitPaths;
use serde::{Deserialize, Serialize};

use crate::errors::DaemonError;

/// Daemon-specific configuration, read from the `[daemon]` section of
/// `~/.conduit/config.toml`.
///
/// The daemon reads this section itself rather than depending on the whole
/// of `conduit-config::Config` — it only cares about its own process
/// bookkeeping (socket/pid paths, buffer sizes, shutdown grace), not about
/// agents, git or dev servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the Unix domain socket. Default: `~/.conduit/daemon.sock`.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Path to the PID file. Default: `~/.conduit/daemon.pid`.
    #[serde(default = "default_pid_path")]
    pub pid_path: PathBuf,

    /// Per-pane scrollback ring buffer size in bytes. Default: 262144 (256 KB).
    #[serde(default = "default_scrollback_buffer_size")]
    pub scrollback_buffer_size: usize,

    /// Per-client output broadcast channel depth, in messages.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Time in seconds to wait for PTYs to exit during shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl DaemonConfig {
    /// Validate configuration values. Called after loading to catch
    /// misconfiguration early instead of at first use.
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.scrollback_buffer_size == 0 {
            return Err(DaemonError::ConfigInvalid(
                "scrollback_buffer_size must be > 0".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(DaemonError::ConfigInvalid(
                "broadcast_capacity must be > 0".to_string(),
            ));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(DaemonError::ConfigInvalid(
                "shutdown_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            pid_path: default_pid_path(),
            scrollback_buffer_size: default_scrollback_buffer_size(),
            broadcast_capacity: default_broadcast_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn resolve_paths_or_tmp() -> ConduitPaths {
    ConduitPaths::resolve().unwrap_or_else(|e| {
        tracing::warn!(
            event = "daemon.config.home_dir_fallback",
            error = %e,
            fallback = "/tmp/.conduit",
        );
        ConduitPaths::from_dir(PathBuf::from("/tmp/.conduit"))
    })
}

fn default_socket_path() -> PathBuf {
    resolve_paths_or_tmp().daemon_socket()
}

fn default_pid_path() -> PathBuf {
    resolve_paths_or_tmp().daemon_pid_file()
}

fn default_scrollback_buffer_size() -> usize {
    262_144
}

fn default_broadcast_capacity() -> usize {
    64
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

/// Wrapper for deserializing just the `[daemon]` section from a conduit
/// config file.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    daemon: DaemonConfig,
}

/// Load daemon configuration from `~/.conduit/config.toml`, falling back to
/// defaults if the file or the `[daemon]` section is missing.
pub fn load_daemon_config() -> Result<DaemonConfig, DaemonError> {
    let config_path = resolve_paths_or_tmp().user_config();

    let config = match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(file) => file.daemon,
            Err(e) => {
                tracing::warn!(
                    event = "daemon.config.parse_failed",
                    path = %config_path.display(),
                    error = %e,
                );
                DaemonConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DaemonConfig::default(),
        Err(e) => {
            tracing::warn!(
                event = "daemon.config.read_failed",
                path = %config_path.display(),
                error = %e,
            );
            DaemonConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Runtime status of the daemon process, surfaced for `conduit daemon status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub uptime_secs: u64,
    pub pane_count: usize,
    pub active_ptys: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_config_defaults() {
        let config = DaemonConfig::default();
        assert!(config.socket_path.ends_with("daemon.sock"));
        assert_eq!(config.scrollback_buffer_size, 262_144);
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_daemon_config_serde_roundtrip() {
        let config = DaemonConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DaemonConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scrollback_buffer_size, config.scrollback_buffer_size);
        assert_eq!(parsed.shutdown_timeout_secs, config.shutdown_timeout_secs);
    }

    #[test]
    fn test_load_daemon_config_from_toml() {
        let toml_str = r#"
[daemon]
scrollback_buffer_size = 1024
shutdown_timeout_secs = 10
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.daemon.scrollback_buffer_size, 1024);
        assert_eq!(file.daemon.shutdown_timeout_secs, 10);
        assert_eq!(file.daemon.broadcast_capacity, 64);
    }

    #[test]
    fn test_load_daemon_config_missing_section() {
        let toml_str = r#"
[agent]
default = "claude"
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.daemon.scrollback_buffer_size, 262_144);
        assert_eq!(file.daemon.shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_validate_defaults_ok() {
        assert!(DaemonConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_scrollback_fails() {
        let mut config = DaemonConfig::default();
        config.scrollback_buffer_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scrollback_buffer_size"));
    }

    #[test]
    fn test_validate_zero_shutdown_timeout_fails() {
        let mut config = DaemonConfig::default();
        config.shutdown_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shutdown_timeout_secs"));
    }
}
