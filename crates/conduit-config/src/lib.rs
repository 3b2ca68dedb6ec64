//! # conduit-config
//!
//! TOML configuration types, loading, and validation for conduit.
//!
//! Single source of truth for `Config` and its sub-sections. Depends only
//! on `conduit-paths`.

mod errors;
mod include_config;
mod loading;
mod types;
mod validation;

pub use errors::ConfigError;
pub use include_config::{CopyOptions, IncludeConfig, PatternRule, default_include_patterns};
pub use loading::{load_hierarchy, merge_configs};
pub use types::{AgentConfig, AgentSettings, Config, DaemonRuntimeConfig, GitConfig};
pub use validation::{VALID_AGENT_TYPES, validate_config};

impl Config {
    /// Load configuration from the user/project hierarchy. See
    /// [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, Box<dyn std::error::Error>> {
        loading::load_hierarchy()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }
}
