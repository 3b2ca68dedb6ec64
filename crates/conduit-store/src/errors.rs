use std::error::Error;

/// Error taxonomy surfaced by the store. Mapped by callers onto the
/// closed `ErrorKind` set exposed over the wire protocol.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("integrity violation: {message}")]
    IntegrityError { message: String },

    #[error("migration '{name}' failed: {source}")]
    MigrationError {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict {
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        StoreError::IntegrityError {
            message: message.into(),
        }
    }

    /// True when the underlying sqlite error is a uniqueness-constraint
    /// violation, so callers can translate it into [`StoreError::Conflict`]
    /// with a meaningful message.
    pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

fn _assert_error_object_safe(_e: &dyn Error) {}
