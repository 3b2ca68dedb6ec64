use std::path::Path;
use std::time::Duration;

use conduit_config::IncludeConfig;
use tracing::{info, warn};

use crate::types::{BootstrapStepResult, BootstrapSummary};

/// Copies files from `source_dir` into `worktree_dir` that match the
/// project's include patterns (`.env*` by default), even though they are
/// typically gitignored and therefore absent from the fresh checkout.
pub fn copy_env_files(
    source_dir: &Path,
    worktree_dir: &Path,
    include: &IncludeConfig,
) -> std::io::Result<Vec<String>> {
    if !include.enabled {
        return Ok(Vec::new());
    }

    let max_bytes = include.max_file_size.as_deref().and_then(parse_size);
    let mut copied = Vec::new();

    for entry in walk_relative(source_dir)? {
        let matches = include
            .patterns
            .iter()
            .any(|pattern| glob::Pattern::new(pattern).map(|p| p.matches(&entry)).unwrap_or(false));
        if !matches {
            continue;
        }

        let source_path = source_dir.join(&entry);
        let metadata = match std::fs::metadata(&source_path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if let Some(limit) = max_bytes {
            if metadata.len() > limit {
                warn!(
                    event = "git.bootstrap.file_skipped_too_large",
                    file = entry,
                    size = metadata.len(),
                    limit
                );
                continue;
            }
        }

        let dest_path = worktree_dir.join(&entry);
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source_path, &dest_path)?;
        copied.push(entry);
    }

    Ok(copied)
}

fn walk_relative(root: &Path) -> std::io::Result<Vec<String>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(out)
}

fn parse_size(spec: &str) -> Option<u64> {
    let spec = spec.trim().to_uppercase();
    if let Some(num) = spec.strip_suffix("MB") {
        num.trim().parse::<u64>().ok().map(|n| n * 1024 * 1024)
    } else if let Some(num) = spec.strip_suffix("KB") {
        num.trim().parse::<u64>().ok().map(|n| n * 1024)
    } else {
        spec.parse::<u64>().ok()
    }
}

/// Something that can run a configured setup step (e.g. `npm install`)
/// inside the worktree and capture its output. Implemented by the
/// external-command runner in the daemon crate; kept as a trait here so
/// `conduit-git` does not need a process-execution or async dependency.
pub trait StepRunner {
    fn run(&self, worktree_dir: &Path, command: &str, timeout: Duration) -> BootstrapStepResult;
}

/// Runs environment bootstrap for a freshly created worktree: copies env
/// files, then runs each configured setup step in order, stopping at the
/// first failure but always returning a summary rather than an error —
/// bootstrap failure never deletes the worktree.
pub fn run_bootstrap(
    source_dir: &Path,
    worktree_dir: &Path,
    include: Option<&IncludeConfig>,
    steps: &[String],
    step_timeout: Duration,
    runner: &dyn StepRunner,
) -> BootstrapSummary {
    let env_files_copied = match include {
        Some(include) => copy_env_files(source_dir, worktree_dir, include).unwrap_or_else(|e| {
            warn!(event = "git.bootstrap.env_copy_failed", error = %e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut step_results = Vec::with_capacity(steps.len());
    let mut success = true;
    for command in steps {
        let result = runner.run(worktree_dir, command, step_timeout);
        if !result.success {
            success = false;
        }
        step_results.push(result);
        if !success {
            break;
        }
    }

    info!(
        event = "git.bootstrap.completed",
        worktree_path = %worktree_dir.display(),
        env_files_copied = env_files_copied.len(),
        steps_run = step_results.len(),
        success
    );

    BootstrapSummary {
        env_files_copied,
        steps: step_results,
        success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_understands_mb_suffix() {
        assert_eq!(parse_size("10MB"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("512KB"), Some(512 * 1024));
        assert_eq!(parse_size("4096"), Some(4096));
    }

    #[test]
    fn copy_env_files_matches_configured_patterns() {
        let source = std::env::temp_dir().join(format!("conduit_bootstrap_src_{}", std::process::id()));
        let dest = std::env::temp_dir().join(format!("conduit_bootstrap_dst_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&source);
        let _ = std::fs::remove_dir_all(&dest);
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(source.join(".env"), "SECRET=1").unwrap();
        std::fs::write(source.join("README.md"), "hi").unwrap();

        let include = IncludeConfig::default();
        let copied = copy_env_files(&source, &dest, &include).unwrap();

        assert_eq!(copied, vec![".env".to_string()]);
        assert!(dest.join(".env").exists());
        assert!(!dest.join("README.md").exists());

        let _ = std::fs::remove_dir_all(&source);
        let _ = std::fs::remove_dir_all(&dest);
    }
}
