use crate::errors::ConfigError;
use crate::types::Config;

/// Agent types recognized by the core. Closed set — session creation rejects
/// anything else with `BadRequest`.
pub const VALID_AGENT_TYPES: &[&str] = &["claude", "amp", "opencode"];

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !VALID_AGENT_TYPES.contains(&config.agent.default.as_str()) {
        return Err(ConfigError::InvalidAgent {
            agent: config.agent.default.clone(),
            supported_agents: VALID_AGENT_TYPES.join(", "),
        });
    }

    if let Some(include) = &config.include_patterns {
        include
            .validate()
            .map_err(|message| ConfigError::InvalidConfiguration { message })?;
    }

    if config.daemon.port_range_start >= config.daemon.port_range_end {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "daemon.port_range_start ({}) must be less than port_range_end ({})",
                config.daemon.port_range_start, config.daemon.port_range_end
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config_passes() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_agent_rejected() {
        let mut config = Config::default();
        config.agent.default = "gpt".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAgent { .. }));
    }

    #[test]
    fn test_inverted_port_range_rejected() {
        let mut config = Config::default();
        config.daemon.port_range_start = 4000;
        config.daemon.port_range_end = 3000;
        assert!(validate_config(&config).is_err());
    }
}
