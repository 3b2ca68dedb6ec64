/// The closed error taxonomy every core operation reports through. The HTTP
/// surface (or any other transport) maps these onto status codes; the daemon
/// maps `DaemonError`/`GitError`/`StoreError`/`ForgeError` onto these at the
/// boundary rather than leaking the crate-local error types upward.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    /// External-command non-zero exit.
    #[error("upstream command failed (exit {exit_code:?}): {stderr}")]
    Upstream { exit_code: Option<i32>, stderr: String },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transient failure, safe to retry: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "bad_request",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::Upstream { .. } => "upstream",
            CoreError::Timeout(_) => "timeout",
            CoreError::Transient(_) => "transient",
            CoreError::Internal(_) => "internal",
        }
    }

    /// Maps onto the exit codes documented for any CLI front-end: `0`
    /// success, `1` user error, `2` internal error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::BadRequest(_) | CoreError::NotFound { .. } | CoreError::Conflict(_) => 1,
            _ => 2,
        }
    }
}

impl From<conduit_store::StoreError> for CoreError {
    fn from(e: conduit_store::StoreError) -> Self {
        match e {
            conduit_store::StoreError::NotFound { entity, id } => {
                CoreError::NotFound { entity, id }
            }
            conduit_store::StoreError::Conflict { message } => CoreError::Conflict(message),
            conduit_store::StoreError::IntegrityError { message } => {
                CoreError::BadRequest(message)
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<conduit_git::GitError> for CoreError {
    fn from(e: conduit_git::GitError) -> Self {
        match &e {
            conduit_git::GitError::BranchAlreadyExists { .. }
            | conduit_git::GitError::WorktreeAlreadyExists { .. } => {
                CoreError::Conflict(e.to_string())
            }
            conduit_git::GitError::NotInRepository
            | conduit_git::GitError::InvalidFeatureName => CoreError::BadRequest(e.to_string()),
            conduit_git::GitError::WorktreeNotFound { .. } => CoreError::NotFound {
                entity: "worktree",
                id: e.to_string(),
            },
            _ => CoreError::Internal(e.to_string()),
        }
    }
}

impl From<conduit_forge::ForgeError> for CoreError {
    fn from(e: conduit_forge::ForgeError) -> Self {
        match e {
            conduit_forge::ForgeError::CliNotAvailable => CoreError::BadRequest(e.to_string()),
            conduit_forge::ForgeError::CliError { message } => CoreError::Upstream {
                exit_code: None,
                stderr: message,
            },
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<CommandError> for CoreError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Timeout(d) => CoreError::Timeout(d),
            CommandError::NonZeroExit { code, stderr } => CoreError::Upstream {
                exit_code: code,
                stderr,
            },
            CommandError::Killed => CoreError::Transient("command was killed".to_string()),
            CommandError::Cancelled => CoreError::Transient("command was cancelled".to_string()),
            CommandError::Io(err) => CoreError::Internal(err.to_string()),
        }
    }
}

pub use crate::command::CommandError;

pub type CoreResult<T> = Result<T, CoreError>;
