use serde::{Deserialize, Serialize};

/// Configuration for copying environment files into a fresh worktree.
///
/// When creating a worktree, files matching these patterns are copied from
/// the source working directory even if `.gitignore`'d, per the worktree
/// manager's environment bootstrap step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeConfig {
    /// Glob patterns to match against relative file paths.
    /// Examples: ".env*", "*.local.json".
    #[serde(default = "default_include_patterns")]
    pub patterns: Vec<String>,

    /// Whether include-pattern copying is enabled. Defaults to true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Optional maximum file size (e.g. "10MB"). Larger files are skipped
    /// with a warning in the bootstrap summary.
    #[serde(default)]
    pub max_file_size: Option<String>,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            patterns: default_include_patterns(),
            enabled: default_enabled(),
            max_file_size: None,
        }
    }
}

pub fn default_include_patterns() -> Vec<String> {
    vec![".env".to_string(), ".env.*".to_string()]
}

fn default_enabled() -> bool {
    true
}

impl IncludeConfig {
    /// Validate that all patterns are valid glob patterns.
    pub fn validate(&self) -> Result<(), String> {
        for pattern in &self.patterns {
            glob::Pattern::new(pattern)
                .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
        }
        Ok(())
    }
}

/// A compiled glob pattern rule for matching files during bootstrap copy.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub pattern: String,
    compiled: glob::Pattern,
}

impl PatternRule {
    pub fn new(pattern: String) -> Result<Self, glob::PatternError> {
        let compiled = glob::Pattern::new(&pattern)?;
        Ok(Self { pattern, compiled })
    }

    pub fn compiled(&self) -> &glob::Pattern {
        &self.compiled
    }

    pub fn matches(&self, relative_path: &str) -> bool {
        self.compiled.matches(relative_path)
    }
}

/// Options for copying files safely into a worktree.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub max_file_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let cfg = IncludeConfig::default();
        assert!(cfg.enabled);
        assert!(cfg.patterns.contains(&".env".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let cfg = IncludeConfig {
            patterns: vec!["[".to_string()],
            enabled: true,
            max_file_size: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_pattern_rule_matches() {
        let rule = PatternRule::new(".env*".to_string()).unwrap();
        assert!(rule.matches(".env.local"));
        assert!(!rule.matches("package.json"));
    }
}
