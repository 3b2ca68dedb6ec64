use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeInfo {
    pub worktree_path: PathBuf,
    pub branch_name: String,
    pub base_branch: String,
}

/// Outcome of one configured setup step (e.g. `npm install`) run during
/// environment bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapStepResult {
    pub command: String,
    pub success: bool,
    pub output: String,
}

/// Summary the UI can fetch for a worktree's asynchronous bootstrap.
/// Bootstrap failure never deletes the worktree; it is only reported here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub env_files_copied: Vec<String>,
    pub steps: Vec<BootstrapStepResult>,
    pub success: bool,
}
