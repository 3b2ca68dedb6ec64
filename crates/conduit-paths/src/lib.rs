use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found — set $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for the `~/.conduit/` directory layout.
///
/// Single source of truth for every path the core touches. Use `resolve()`
/// in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct ConduitPaths {
    conduit_dir: PathBuf,
}

impl ConduitPaths {
    /// Resolve paths from the user's home directory (`~/.conduit`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            conduit_dir: home.join(".conduit"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(conduit_dir: PathBuf) -> Self {
        Self { conduit_dir }
    }

    /// The base `~/.conduit` directory ("user-state root" in the design docs).
    pub fn conduit_dir(&self) -> &Path {
        &self.conduit_dir
    }

    // --- Top-level subdirectories ---

    pub fn worktrees_dir(&self) -> PathBuf {
        self.conduit_dir.join("worktrees")
    }

    pub fn pids_dir(&self) -> PathBuf {
        self.conduit_dir.join("pids")
    }

    pub fn mcp_dir(&self) -> PathBuf {
        self.conduit_dir.join("mcp")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.conduit_dir.join("logs")
    }

    // --- Top-level files ---

    pub fn store_db(&self) -> PathBuf {
        self.conduit_dir.join("store.db")
    }

    pub fn daemon_socket(&self) -> PathBuf {
        self.conduit_dir.join("daemon.sock")
    }

    pub fn daemon_pid_file(&self) -> PathBuf {
        self.conduit_dir.join("daemon.pid")
    }

    pub fn daemon_log_file(&self) -> PathBuf {
        self.logs_dir().join("daemon.log")
    }

    pub fn user_config(&self) -> PathBuf {
        self.conduit_dir.join("config.toml")
    }

    // --- Parameterized paths ---

    /// Worktree directory for a session: `<root>/worktrees/<project>-<slug>/`.
    pub fn worktree_dir(&self, project_slug: &str, branch_slug: &str) -> PathBuf {
        self.worktrees_dir()
            .join(format!("{project_slug}-{branch_slug}"))
    }

    pub fn pid_file(&self, session_id: &str) -> PathBuf {
        let safe_id = session_id.replace('/', "-");
        self.pids_dir().join(format!("{safe_id}.pid"))
    }

    /// Per-session MCP tool-manifest config: `<root>/mcp/<session_id>.json`.
    pub fn mcp_config(&self, session_id: &str) -> PathBuf {
        let safe_id = session_id.replace('/', "-");
        self.mcp_dir().join(format!("{safe_id}.json"))
    }

    // --- Static helpers (no self) ---

    /// Project-level config override: `<project_root>/.conduit/config.toml`.
    pub fn project_config(project_root: &Path) -> PathBuf {
        project_root.join(".conduit").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths() -> ConduitPaths {
        ConduitPaths::from_dir(PathBuf::from("/home/user/.conduit"))
    }

    #[test]
    fn test_resolve_returns_ok_when_home_set() {
        let result = ConduitPaths::resolve();
        assert!(result.is_ok());
        assert!(result.unwrap().conduit_dir().to_string_lossy().contains(".conduit"));
    }

    #[test]
    fn test_from_dir() {
        let paths = ConduitPaths::from_dir(PathBuf::from("/tmp/test-conduit"));
        assert_eq!(paths.conduit_dir(), Path::new("/tmp/test-conduit"));
    }

    #[test]
    fn test_worktrees_dir() {
        assert_eq!(
            test_paths().worktrees_dir(),
            PathBuf::from("/home/user/.conduit/worktrees")
        );
    }

    #[test]
    fn test_store_db() {
        assert_eq!(
            test_paths().store_db(),
            PathBuf::from("/home/user/.conduit/store.db")
        );
    }

    #[test]
    fn test_daemon_socket() {
        assert_eq!(
            test_paths().daemon_socket(),
            PathBuf::from("/home/user/.conduit/daemon.sock")
        );
    }

    #[test]
    fn test_worktree_dir() {
        assert_eq!(
            test_paths().worktree_dir("myrepo", "add-dark-mode"),
            PathBuf::from("/home/user/.conduit/worktrees/myrepo-add-dark-mode")
        );
    }

    #[test]
    fn test_pid_file_sanitizes_slashes() {
        assert_eq!(
            test_paths().pid_file("project/branch"),
            PathBuf::from("/home/user/.conduit/pids/project-branch.pid")
        );
    }

    #[test]
    fn test_mcp_config() {
        assert_eq!(
            test_paths().mcp_config("sess_1"),
            PathBuf::from("/home/user/.conduit/mcp/sess_1.json")
        );
    }

    #[test]
    fn test_project_config() {
        assert_eq!(
            ConduitPaths::project_config(Path::new("/my/project")),
            PathBuf::from("/my/project/.conduit/config.toml")
        );
    }

    #[test]
    fn test_path_error_message() {
        let err = PathError::HomeNotFound;
        let msg = err.to_string();
        assert!(msg.contains("home directory not found"));
    }
}
