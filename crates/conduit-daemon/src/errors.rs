use std::io;

use conduit_protocol::ErrorCode;

/// All error types for the conduit-daemon crate.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon not running")]
    NotRunning,

    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("pane not found: {0}")]
    PaneNotFound(String),

    #[error("pane already exists: {0}")]
    PaneAlreadyExists(String),

    #[error("pane not running: {0}")]
    PaneNotRunning(String),

    #[error("PTY error: {0}")]
    PtyError(String),

    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("shutdown timeout exceeded")]
    ShutdownTimeout,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl DaemonError {
    /// Map to the wire-level error code carried in a `DaemonMessage::Error`.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            DaemonError::NotRunning => ErrorCode::DaemonNotRunning,
            DaemonError::AlreadyRunning(_) => ErrorCode::DaemonAlreadyRunning,
            DaemonError::ConnectionFailed(_) => ErrorCode::ConnectionFailed,
            DaemonError::ProtocolError(_) => ErrorCode::ProtocolError,
            DaemonError::PaneNotFound(_) => ErrorCode::PaneNotFound,
            DaemonError::PaneAlreadyExists(_) => ErrorCode::PaneAlreadyExists,
            DaemonError::PaneNotRunning(_) => ErrorCode::PaneNotRunning,
            DaemonError::PtyError(_) => ErrorCode::PtyError,
            DaemonError::ConfigInvalid(_) => ErrorCode::ProtocolError,
            DaemonError::ShutdownTimeout => ErrorCode::ShutdownTimeout,
            DaemonError::Io(_) => ErrorCode::IoError,
            DaemonError::Serde(_) => ErrorCode::SerializationError,
            DaemonError::Base64Decode(_) => ErrorCode::Base64DecodeError,
        }
    }

    /// Whether this error is caused by a bad client request rather than an
    /// internal fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DaemonError::PaneNotFound(_)
                | DaemonError::PaneAlreadyExists(_)
                | DaemonError::PaneNotRunning(_)
                | DaemonError::AlreadyRunning(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaemonError::PaneNotFound("claude-sess1".to_string());
        assert_eq!(err.to_string(), "pane not found: claude-sess1");
        assert_eq!(err.error_code(), ErrorCode::PaneNotFound);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_error_codes() {
        let cases = vec![
            (DaemonError::NotRunning, ErrorCode::DaemonNotRunning),
            (DaemonError::AlreadyRunning(123), ErrorCode::DaemonAlreadyRunning),
            (
                DaemonError::ConnectionFailed("refused".to_string()),
                ErrorCode::ConnectionFailed,
            ),
            (
                DaemonError::ProtocolError("bad json".to_string()),
                ErrorCode::ProtocolError,
            ),
            (DaemonError::PaneNotFound("x".to_string()), ErrorCode::PaneNotFound),
            (
                DaemonError::PaneAlreadyExists("x".to_string()),
                ErrorCode::PaneAlreadyExists,
            ),
            (
                DaemonError::PaneNotRunning("x".to_string()),
                ErrorCode::PaneNotRunning,
            ),
            (DaemonError::PtyError("alloc failed".to_string()), ErrorCode::PtyError),
            (DaemonError::ShutdownTimeout, ErrorCode::ShutdownTimeout),
        ];

        for (err, expected_code) in cases {
            assert_eq!(err.error_code(), expected_code);
        }
    }

    #[test]
    fn test_user_error_classification() {
        assert!(DaemonError::PaneNotFound("x".to_string()).is_user_error());
        assert!(DaemonError::PaneAlreadyExists("x".to_string()).is_user_error());
        assert!(DaemonError::PaneNotRunning("x".to_string()).is_user_error());
        assert!(DaemonError::AlreadyRunning(123).is_user_error());

        assert!(!DaemonError::NotRunning.is_user_error());
        assert!(!DaemonError::PtyError("x".to_string()).is_user_error());
        assert!(!DaemonError::ShutdownTimeout.is_user_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let daemon_err: DaemonError = io_err.into();
        assert_eq!(daemon_err.error_code(), ErrorCode::IoError);
        assert!(!daemon_err.is_user_error());
    }
}
