use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::include_config::IncludeConfig;

/// Top-level configuration, loaded from the user/project TOML hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub agents: HashMap<String, AgentSettings>,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub daemon: DaemonRuntimeConfig,
    #[serde(default)]
    pub include_patterns: Option<IncludeConfig>,
}

/// Default agent selection and global invocation overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent")]
    pub default: String,
    #[serde(default)]
    pub startup_command: Option<String>,
    #[serde(default)]
    pub flags: Option<Vec<String>>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default: default_agent(),
            startup_command: None,
            flags: None,
        }
    }
}

fn default_agent() -> String {
    "claude".to_string()
}

/// Per-agent-type override: a custom binary path and extra flags appended
/// after the per-vendor flag builder's own flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

/// Worktree creation and bootstrap-hook configuration (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_base_branch")]
    pub default_base_branch: String,
    /// Shell commands run (in order) inside a freshly created worktree,
    /// e.g. `["npm install"]`. Each runs via the external-command runner's
    /// `run_in_shell` variant since these are user-authored strings.
    #[serde(default)]
    pub bootstrap_steps: Vec<String>,
    /// Per-step timeout, in seconds.
    #[serde(default = "default_bootstrap_timeout_secs")]
    pub bootstrap_timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_base_branch: default_base_branch(),
            bootstrap_steps: Vec::new(),
            bootstrap_timeout_secs: default_bootstrap_timeout_secs(),
        }
    }
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_bootstrap_timeout_secs() -> u64 {
    300
}

/// Daemon and resource-allocation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRuntimeConfig {
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,
    #[serde(default = "default_scrollback_buffer_size")]
    pub scrollback_buffer_size: usize,
    /// Grace period between SIGTERM and SIGKILL for killed external commands
    /// and stopped dev servers, in milliseconds.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
}

impl Default for DaemonRuntimeConfig {
    fn default() -> Self {
        Self {
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            scrollback_buffer_size: default_scrollback_buffer_size(),
            kill_grace_ms: default_kill_grace_ms(),
        }
    }
}

fn default_port_range_start() -> u16 {
    3100
}

fn default_port_range_end() -> u16 {
    3999
}

fn default_scrollback_buffer_size() -> usize {
    64 * 1024
}

fn default_kill_grace_ms() -> u64 {
    3_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.default, "claude");
        assert_eq!(config.git.default_base_branch, "main");
        assert_eq!(config.daemon.port_range_start, 3100);
        assert_eq!(config.daemon.port_range_end, 3999);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [agent]
            default = "amp"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.default, "amp");
        assert_eq!(config.daemon.scrollback_buffer_size, 64 * 1024);
    }

    #[test]
    fn test_parse_git_bootstrap_steps() {
        let toml_str = r#"
            [git]
            default_base_branch = "develop"
            bootstrap_steps = ["npm install", "cp .env.example .env"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.git.default_base_branch, "develop");
        assert_eq!(config.git.bootstrap_steps.len(), 2);
    }
}
