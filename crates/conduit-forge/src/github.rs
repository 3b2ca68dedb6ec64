use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::ForgeError;
use crate::traits::ForgeBackend;
use crate::types::{PrRecord, PrStatus};

/// GitHub forge backend backed by the `gh` CLI. Invoked with an explicit
/// argv (never a shell string) and `current_dir` set to the worktree, the
/// same discipline the external-command runner applies to every other
/// subprocess conduit spawns.
pub struct GitHubBackend;

#[derive(Debug, Deserialize)]
struct GhPrView {
    number: i64,
    url: String,
    state: String,
}

fn parse_state(state: &str) -> PrStatus {
    match state.to_uppercase().as_str() {
        "MERGED" => PrStatus::Merged,
        "CLOSED" => PrStatus::Closed,
        _ => PrStatus::Open,
    }
}

fn run_gh(worktree_path: &Path, args: &[&str]) -> Result<std::process::Output, ForgeError> {
    debug!(event = "forge.github.cli_invoked", args = ?args);
    Command::new("gh")
        .current_dir(worktree_path)
        .args(args)
        .output()
        .map_err(ForgeError::from)
}

impl ForgeBackend for GitHubBackend {
    fn name(&self) -> &'static str {
        "github"
    }

    fn is_available(&self) -> bool {
        which::which("gh").is_ok()
    }

    fn fetch_pr(&self, worktree_path: &Path, branch: &str) -> Result<Option<PrRecord>, ForgeError> {
        let output = run_gh(
            worktree_path,
            &["pr", "view", branch, "--json", "number,url,state"],
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no pull requests found") || stderr.contains("Could not resolve") {
                return Ok(None);
            }
            return Err(ForgeError::CliError {
                message: stderr.trim().to_string(),
            });
        }

        let view: GhPrView = serde_json::from_slice(&output.stdout)
            .map_err(|e| ForgeError::ParseError { message: e.to_string() })?;

        Ok(Some(PrRecord {
            url: view.url,
            number: view.number,
            status: parse_state(&view.state),
        }))
    }

    fn create_or_update_pr(
        &self,
        worktree_path: &Path,
        branch: &str,
        base_branch: &str,
        title: &str,
    ) -> Result<PrRecord, ForgeError> {
        if let Some(existing) = self.fetch_pr(worktree_path, branch)? {
            info!(event = "forge.github.pr_already_exists", branch, number = existing.number);
            return Ok(existing);
        }

        let output = run_gh(
            worktree_path,
            &[
                "pr",
                "create",
                "--head",
                branch,
                "--base",
                base_branch,
                "--title",
                title,
                "--body",
                "",
            ],
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(event = "forge.github.pr_create_failed", branch, error = %stderr);
            return Err(ForgeError::CliError {
                message: stderr.trim().to_string(),
            });
        }

        self.fetch_pr(worktree_path, branch)?.ok_or_else(|| ForgeError::ParseError {
            message: "gh pr create succeeded but the PR could not be found afterward".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_state_maps_merged_and_closed() {
        assert_eq!(parse_state("MERGED"), PrStatus::Merged);
        assert_eq!(parse_state("CLOSED"), PrStatus::Closed);
        assert_eq!(parse_state("OPEN"), PrStatus::Open);
    }
}
