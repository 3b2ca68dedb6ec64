use std::path::{Path, PathBuf};

use crate::errors::GitError;

const MAX_SLUG_LEN: usize = 50;

/// Generates a branch name from a human-entered feature name: lowercase,
/// non-alphanumerics collapsed to a single `-`, trimmed, truncated to 50
/// characters, prefixed with `feature/`.
///
/// `"Add Dark Mode!!"` → `"feature/add-dark-mode"`.
pub fn branch_name_from_feature(feature_name: &str) -> Result<String, GitError> {
    let lowered = feature_name.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        return Err(GitError::InvalidFeatureName);
    }
    let truncated: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    let truncated = truncated.trim_end_matches('-');

    Ok(format!("feature/{truncated}"))
}

/// Appends `-2`, `-3`, ... to `candidate` until `exists` reports the name
/// is free. `exists` is expected to check local branch existence.
pub fn resolve_branch_collision(
    candidate: &str,
    mut exists: impl FnMut(&str) -> bool,
) -> String {
    if !exists(candidate) {
        return candidate.to_string();
    }
    let mut suffix = 2;
    loop {
        let attempt = format!("{candidate}-{suffix}");
        if !exists(&attempt) {
            return attempt;
        }
        suffix += 1;
    }
}

/// Sanitizes a string for safe use as a filesystem path component,
/// replacing path separators with hyphens.
pub fn sanitize_for_path(s: &str) -> String {
    s.replace('/', "-")
}

/// `<user-state>/worktrees/<project>-<slug>`, with numeric-suffix
/// collision resolution performed by the caller via `exists`.
pub fn worktree_path(worktrees_root: &Path, project_name: &str, branch: &str) -> PathBuf {
    let slug = sanitize_for_path(branch);
    worktrees_root.join(format!("{project_name}-{slug}"))
}

/// Appends `-2`, `-3`, ... to a worktree directory name until `exists`
/// (typically `Path::exists`) reports the path is free.
pub fn resolve_path_collision(
    worktrees_root: &Path,
    project_name: &str,
    branch: &str,
    mut exists: impl FnMut(&Path) -> bool,
) -> PathBuf {
    let base = worktree_path(worktrees_root, project_name, branch);
    if !exists(&base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let slug = sanitize_for_path(branch);
        let attempt = worktrees_root.join(format!("{project_name}-{slug}-{suffix}"));
        if !exists(&attempt) {
            return attempt;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclamation_marks_collapse_to_single_dash() {
        assert_eq!(
            branch_name_from_feature("Add Dark Mode!!").unwrap(),
            "feature/add-dark-mode"
        );
    }

    #[test]
    fn long_feature_names_truncate_to_fifty_chars() {
        let long_name = "a".repeat(60);
        let branch = branch_name_from_feature(&long_name).unwrap();
        assert_eq!(branch, format!("feature/{}", "a".repeat(50)));
    }

    #[test]
    fn empty_feature_name_is_rejected() {
        assert!(matches!(
            branch_name_from_feature("   !!! "),
            Err(GitError::InvalidFeatureName)
        ));
    }

    #[test]
    fn collision_resolution_appends_numeric_suffix() {
        let taken = ["feature/add-dark-mode", "feature/add-dark-mode-2"];
        let resolved =
            resolve_branch_collision("feature/add-dark-mode", |name| taken.contains(&name));
        assert_eq!(resolved, "feature/add-dark-mode-3");
    }

    #[test]
    fn worktree_path_joins_project_and_slug() {
        let root = Path::new("/home/user/.conduit/worktrees");
        let path = worktree_path(root, "myproj", "feature/add-dark-mode");
        assert_eq!(
            path,
            PathBuf::from("/home/user/.conduit/worktrees/myproj-feature-add-dark-mode")
        );
    }
}
