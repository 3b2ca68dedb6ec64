//! Configuration loading and merging.
//!
//! # Configuration hierarchy
//!
//! Later sources override earlier ones:
//! 1. Hardcoded defaults
//! 2. User config — `~/.conduit/config.toml`
//! 3. Project config — `<cwd>/.conduit/config.toml`

use std::fs;
use std::path::Path;

use conduit_paths::ConduitPaths;

use crate::include_config::IncludeConfig;
use crate::types::{AgentConfig, Config, DaemonRuntimeConfig, GitConfig};
use crate::validation::validate_config;

fn is_file_not_found(e: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
        return io_err.kind() == std::io::ErrorKind::NotFound;
    }
    e.to_string().contains("No such file or directory")
}

/// Load and merge configuration from the user/project hierarchy, then
/// validate the result. Missing config files are not an error.
pub fn load_hierarchy() -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::default();

    match load_user_config() {
        Ok(user_config) => config = merge_configs(config, user_config),
        Err(e) if !is_file_not_found(e.as_ref()) => return Err(e),
        Err(_) => {}
    }

    match load_project_config() {
        Ok(project_config) => config = merge_configs(config, project_config),
        Err(e) if !is_file_not_found(e.as_ref()) => return Err(e),
        Err(_) => {}
    }

    validate_config(&config)?;
    Ok(config)
}

fn load_user_config() -> Result<Config, Box<dyn std::error::Error>> {
    let paths = ConduitPaths::resolve().map_err(|e| e.to_string())?;
    load_config_file(&paths.user_config())
}

fn load_project_config() -> Result<Config, Box<dyn std::error::Error>> {
    let project_root = std::env::current_dir()?;
    load_config_file(&ConduitPaths::project_config(&project_root))
}

fn load_config_file(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| std::io::Error::new(e.kind(), format!("'{}': {}", path.display(), e)))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| format!("failed to parse config file '{}': {}", path.display(), e))?;
    Ok(config)
}

fn merge_include_patterns(
    base: Option<IncludeConfig>,
    over: Option<IncludeConfig>,
) -> Option<IncludeConfig> {
    match (base, over) {
        (Some(base_cfg), Some(over_cfg)) => {
            let mut merged = base_cfg.patterns;
            for pattern in over_cfg.patterns {
                if !merged.contains(&pattern) {
                    merged.push(pattern);
                }
            }
            Some(IncludeConfig {
                patterns: merged,
                enabled: over_cfg.enabled,
                max_file_size: over_cfg.max_file_size.or(base_cfg.max_file_size),
            })
        }
        (None, Some(over_cfg)) => Some(over_cfg),
        (Some(base_cfg), None) => Some(base_cfg),
        (None, None) => None,
    }
}

/// Merge two configs, with `over` taking precedence.
pub fn merge_configs(base: Config, over: Config) -> Config {
    Config {
        agent: AgentConfig {
            default: over.agent.default,
            startup_command: over.agent.startup_command.or(base.agent.startup_command),
            flags: over.agent.flags.or(base.agent.flags),
        },
        agents: {
            let mut merged = base.agents;
            for (key, value) in over.agents {
                merged.insert(key, value);
            }
            merged
        },
        git: GitConfig {
            default_base_branch: over.git.default_base_branch,
            bootstrap_steps: if over.git.bootstrap_steps.is_empty() {
                base.git.bootstrap_steps
            } else {
                over.git.bootstrap_steps
            },
            bootstrap_timeout_secs: over.git.bootstrap_timeout_secs,
        },
        daemon: DaemonRuntimeConfig {
            port_range_start: over.daemon.port_range_start,
            port_range_end: over.daemon.port_range_end,
            scrollback_buffer_size: over.daemon.scrollback_buffer_size,
            kill_grace_ms: over.daemon.kill_grace_ms,
        },
        include_patterns: merge_include_patterns(base.include_patterns, over.include_patterns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_agent_override_wins() {
        let base = Config::default();
        let mut over = Config::default();
        over.agent.default = "amp".to_string();
        let merged = merge_configs(base, over);
        assert_eq!(merged.agent.default, "amp");
    }

    #[test]
    fn test_merge_bootstrap_steps_fallback_to_base() {
        let mut base = Config::default();
        base.git.bootstrap_steps = vec!["npm install".to_string()];
        let over = Config::default();
        let merged = merge_configs(base, over);
        assert_eq!(merged.git.bootstrap_steps, vec!["npm install".to_string()]);
    }

    #[test]
    fn test_merge_include_patterns_deduplicates() {
        let mut base = Config::default();
        base.include_patterns = Some(IncludeConfig {
            patterns: vec![".env".to_string()],
            enabled: true,
            max_file_size: None,
        });
        let mut over = Config::default();
        over.include_patterns = Some(IncludeConfig {
            patterns: vec![".env".to_string(), ".env.local".to_string()],
            enabled: true,
            max_file_size: None,
        });
        let merged = merge_configs(base, over);
        let patterns = merged.include_patterns.unwrap().patterns;
        assert_eq!(patterns.len(), 2);
    }
}
