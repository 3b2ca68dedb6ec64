#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("not in a git repository")]
    NotInRepository,

    #[error("branch '{branch}' already exists")]
    BranchAlreadyExists { branch: String },

    #[error("worktree already exists at path: {path}")]
    WorktreeAlreadyExists { path: String },

    #[error("worktree not found at path: {path}")]
    WorktreeNotFound { path: String },

    #[error("failed to remove worktree at {path}: {message}")]
    WorktreeRemovalFailed { path: String, message: String },

    #[error("invalid feature name: cannot generate a branch from an empty name")]
    InvalidFeatureName,

    #[error("git operation failed: {message}")]
    OperationFailed { message: String },

    #[error("no base branch could be resolved: tried {tried:?}, last error: {last_error}")]
    BaseBranchUnresolved {
        tried: Vec<String>,
        last_error: String,
    },

    #[error("git2 library error: {source}")]
    Git2Error {
        #[from]
        source: git2::Error,
    },

    #[error("IO error during git operation: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}
