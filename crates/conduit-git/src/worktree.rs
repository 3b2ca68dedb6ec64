use std::path::Path;

use git2::{BranchType, Repository, WorktreeAddOptions};
use tracing::{debug, info, warn};

use crate::errors::GitError;
use crate::naming;
use crate::types::WorktreeInfo;

fn git2_error(e: git2::Error) -> GitError {
    GitError::Git2Error { source: e }
}

/// libgit2's `git_worktree_add()` creates `.git/worktrees/` with a
/// non-atomic mkdir; two concurrent creates can race on `ErrorCode::Exists`.
/// Retried a few times since the directory existing is itself proof the
/// race, not a genuine duplicate, already resolved.
fn add_worktree_with_retry(
    repo: &Repository,
    name: &str,
    path: &Path,
    opts: &WorktreeAddOptions<'_>,
) -> Result<(), GitError> {
    const MAX_RETRIES: u32 = 3;
    const RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(50);

    let mut attempt = 0;
    loop {
        match repo.worktree(name, path, Some(opts)) {
            Ok(_) => return Ok(()),
            Err(e) if e.code() == git2::ErrorCode::Exists && attempt < MAX_RETRIES => {
                attempt += 1;
                std::thread::sleep(RETRY_DELAY);
            }
            Err(e) => return Err(git2_error(e)),
        }
    }
}

/// Resolves the base commit to branch from, trying in order `origin/<base>`,
/// `refs/heads/<base>`, `<base>`. Returns the first that succeeds; if all
/// fail, surfaces the last error.
fn resolve_base_commit<'repo>(
    repo: &'repo Repository,
    base_branch: &str,
) -> Result<(git2::Commit<'repo>, String), GitError> {
    let candidates = [
        format!("refs/remotes/origin/{base_branch}"),
        format!("refs/heads/{base_branch}"),
        base_branch.to_string(),
    ];

    let mut last_error = None;
    for candidate in &candidates {
        match repo.revparse_single(candidate) {
            Ok(obj) => match obj.peel_to_commit() {
                Ok(commit) => return Ok((commit, candidate.clone())),
                Err(e) => last_error = Some(e),
            },
            Err(e) => last_error = Some(e),
        }
    }

    Err(GitError::BaseBranchUnresolved {
        tried: candidates.to_vec(),
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Creates an isolated worktree for a feature branch. Validates the
/// source path is a git repository, generates a collision-free branch
/// name and worktree directory, resolves the base commit through the
/// fallback chain, and materializes the worktree.
pub fn create_worktree(
    repo_path: &Path,
    worktrees_root: &Path,
    project_name: &str,
    feature_name: &str,
    base_branch: &str,
) -> Result<WorktreeInfo, GitError> {
    let repo = Repository::discover(repo_path).map_err(|_| GitError::NotInRepository)?;

    let candidate_branch = naming::branch_name_from_feature(feature_name)?;
    let branch_name = naming::resolve_branch_collision(&candidate_branch, |name| {
        repo.find_branch(name, BranchType::Local).is_ok()
    });

    let target_path = naming::resolve_path_collision(worktrees_root, project_name, &branch_name, |p| p.exists());

    info!(
        event = "git.worktree.create_started",
        branch = %branch_name,
        worktree_path = %target_path.display()
    );

    if let Some(parent) = target_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if repo.find_branch(&branch_name, BranchType::Local).is_err() {
        let (base_commit, resolved_from) = resolve_base_commit(&repo, base_branch)?;
        debug!(
            event = "git.worktree.base_resolved",
            branch = %branch_name,
            resolved_from
        );
        repo.branch(&branch_name, &base_commit, false)
            .map_err(git2_error)?;
    }

    let admin_name = naming::sanitize_for_path(&branch_name);
    let branch_ref = repo
        .find_branch(&branch_name, BranchType::Local)
        .map_err(git2_error)?
        .into_reference();

    let mut opts = WorktreeAddOptions::new();
    opts.reference(Some(&branch_ref));
    add_worktree_with_retry(&repo, &admin_name, &target_path, &opts)?;

    info!(
        event = "git.worktree.create_completed",
        branch = %branch_name,
        worktree_path = %target_path.display()
    );

    Ok(WorktreeInfo {
        worktree_path: target_path,
        branch_name,
        base_branch: base_branch.to_string(),
    })
}

/// Removes a worktree: `git worktree remove --force` semantics via git2's
/// prune, falling back to best-effort filesystem removal plus a prune
/// pass if the admin entry is already gone. Optionally deletes the
/// branch, refusing for `main`/`master`.
pub fn delete_worktree(
    repo_path: &Path,
    worktree_path: &Path,
    branch_name: &str,
    delete_branch: bool,
) -> Result<(), GitError> {
    let repo = Repository::discover(repo_path).map_err(|_| GitError::NotInRepository)?;

    match find_worktree_by_path(&repo, worktree_path) {
        Some(worktree) => {
            worktree.prune(None).map_err(git2_error)?;
        }
        None => {
            warn!(
                event = "git.worktree.remove_admin_entry_missing",
                worktree_path = %worktree_path.display()
            );
        }
    }

    if worktree_path.exists() {
        std::fs::remove_dir_all(worktree_path)?;
    }

    if delete_branch && branch_name != "main" && branch_name != "master" {
        if let Ok(mut branch) = repo.find_branch(branch_name, BranchType::Local) {
            let _ = branch.delete();
        }
    }

    Ok(())
}

fn find_worktree_by_path<'repo>(repo: &'repo Repository, path: &Path) -> Option<git2::Worktree> {
    let names = repo.worktrees().ok()?;
    for name in names.iter().flatten() {
        if let Ok(worktree) = repo.find_worktree(name) {
            if worktree.path() == path {
                return Some(worktree);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn init_test_repo(path: &Path) -> Repository {
        let repo = Repository::init(path).expect("init repo");
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();
        repo
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("conduit_git_test_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_worktree_checks_out_feature_branch() {
        let repo_dir = temp_dir("create_wt_repo");
        init_test_repo(&repo_dir);
        let worktrees_root = temp_dir("create_wt_trees");

        let info = create_worktree(&repo_dir, &worktrees_root, "demo", "Add Dark Mode!!", "master")
            .unwrap();

        assert_eq!(info.branch_name, "feature/add-dark-mode");
        assert!(info.worktree_path.exists());

        let _ = std::fs::remove_dir_all(&repo_dir);
        let _ = std::fs::remove_dir_all(&worktrees_root);
    }

    #[test]
    fn repeated_create_with_same_feature_appends_suffix() {
        let repo_dir = temp_dir("collide_repo");
        init_test_repo(&repo_dir);
        let worktrees_root = temp_dir("collide_trees");

        let first = create_worktree(&repo_dir, &worktrees_root, "demo", "add dark mode", "master")
            .unwrap();
        let second = create_worktree(&repo_dir, &worktrees_root, "demo", "add dark mode", "master")
            .unwrap();

        assert_eq!(first.branch_name, "feature/add-dark-mode");
        assert_eq!(second.branch_name, "feature/add-dark-mode-2");

        let _ = std::fs::remove_dir_all(&repo_dir);
        let _ = std::fs::remove_dir_all(&worktrees_root);
    }
}
