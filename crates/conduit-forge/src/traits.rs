use std::path::Path;

use crate::errors::ForgeError;
use crate::types::PrRecord;

/// A code-host PR/MR tool. Implemented per forge (GitHub via `gh`, etc.)
/// and invoked from within a session's worktree.
pub trait ForgeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Fetches existing PR info for `branch` if one exists, without
    /// creating anything.
    fn fetch_pr(&self, worktree_path: &Path, branch: &str) -> Result<Option<PrRecord>, ForgeError>;

    /// Creates a PR for `branch` against `base_branch` if none exists yet,
    /// otherwise returns the existing one. This is the backend half of
    /// `pr_upsert`.
    fn create_or_update_pr(
        &self,
        worktree_path: &Path,
        branch: &str,
        base_branch: &str,
        title: &str,
    ) -> Result<PrRecord, ForgeError>;
}
