//! Synchronous JSONL IPC client over a Unix domain socket.
//!
//! Provides `IpcConnection` for connecting to the conduit daemon and sending
//! typed `ClientMessage`/`DaemonMessage` requests. Shared by `conduit-core`
//! and the `conduit` CLI so the JSONL framing logic is written once.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::{ClientMessage, DaemonMessage, ErrorCode};

/// Error from the shared IPC client layer.
#[non_exhaustive]
#[derive(Debug)]
pub enum IpcError {
    /// Daemon socket does not exist or connection was refused.
    NotRunning { path: String },
    /// Socket exists but connection failed for a non-`ConnectionRefused` reason.
    ConnectionFailed(std::io::Error),
    /// Daemon returned an explicit error response.
    DaemonError { code: ErrorCode, message: String },
    /// Protocol-level error (serialization, empty response, invalid JSON).
    ProtocolError { message: String },
    /// Other I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for IpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpcError::NotRunning { path } => {
                write!(f, "daemon is not running (socket not found at {path})")
            }
            IpcError::ConnectionFailed(e) => write!(f, "connection failed: {e}"),
            IpcError::DaemonError { code, message } => {
                write!(f, "daemon error [{code}]: {message}")
            }
            IpcError::ProtocolError { message } => write!(f, "protocol error: {message}"),
            IpcError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for IpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpcError::ConnectionFailed(e) | IpcError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IpcError {
    fn from(e: std::io::Error) -> Self {
        IpcError::Io(e)
    }
}

/// A synchronous JSONL connection to the conduit daemon over a Unix socket.
#[derive(Debug)]
pub struct IpcConnection {
    stream: UnixStream,
}

impl IpcConnection {
    /// Connect to the daemon at the given Unix socket path.
    ///
    /// Checks that the socket file exists, connects, and configures timeouts
    /// (30s read, 5s write). Returns `IpcError::NotRunning` if the socket
    /// doesn't exist or the connection is refused.
    pub fn connect(socket_path: &Path) -> Result<Self, IpcError> {
        if !socket_path.exists() {
            return Err(IpcError::NotRunning {
                path: socket_path.display().to_string(),
            });
        }

        let stream = UnixStream::connect(socket_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                IpcError::NotRunning {
                    path: socket_path.display().to_string(),
                }
            } else {
                IpcError::ConnectionFailed(e)
            }
        })?;

        stream.set_read_timeout(Some(Duration::from_secs(30)))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;

        Ok(Self { stream })
    }

    /// Returns `true` if the underlying socket still looks connected.
    ///
    /// Best-effort: a zero-byte non-blocking peek that distinguishes a
    /// still-open socket from one the peer has closed.
    pub fn is_alive(&self) -> bool {
        self.stream.set_nonblocking(true).is_ok() && {
            let mut buf = [0u8; 1];
            use std::io::Read;
            let alive = match (&self.stream).read(&mut buf) {
                Ok(0) => false,
                Ok(_) => true,
                Err(e) => e.kind() == std::io::ErrorKind::WouldBlock,
            };
            let _ = self.stream.set_nonblocking(false);
            alive
        }
    }

    /// Send a request and block for the matching response.
    ///
    /// Writes one JSON line, then reads lines until one with a matching
    /// `id` arrives (streaming messages like `pty_output` have no `id`
    /// and are skipped).
    pub fn request(&mut self, msg: &ClientMessage) -> Result<DaemonMessage, IpcError> {
        let request_id = msg.id().to_string();
        let mut line = serde_json::to_string(msg)
            .map_err(|e| IpcError::ProtocolError {
                message: e.to_string(),
            })?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;

        let mut reader = BufReader::new(&self.stream);
        loop {
            let mut buf = String::new();
            let n = reader.read_line(&mut buf)?;
            if n == 0 {
                return Err(IpcError::ProtocolError {
                    message: "connection closed before response".to_string(),
                });
            }
            let parsed: DaemonMessage =
                serde_json::from_str(buf.trim_end()).map_err(|e| IpcError::ProtocolError {
                    message: e.to_string(),
                })?;
            let matches_id = match &parsed {
                DaemonMessage::PtyOutput { .. }
                | DaemonMessage::PtyOutputDropped { .. }
                | DaemonMessage::PaneEvent { .. } => false,
                DaemonMessage::PaneCreated { id, .. }
                | DaemonMessage::PaneList { id, .. }
                | DaemonMessage::PaneInfo { id, .. }
                | DaemonMessage::ScrollbackContents { id, .. }
                | DaemonMessage::Error { id, .. }
                | DaemonMessage::Ack { id, .. } => id == &request_id,
            };
            if !matches_id {
                continue;
            }
            if let DaemonMessage::Error { code, message, .. } = parsed {
                return Err(IpcError::DaemonError { code, message });
            }
            return Ok(parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Write};
    use std::os::unix::net::UnixListener;
    use std::thread;

    #[test]
    fn test_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("nonexistent.sock");
        let result = IpcConnection::connect(&sock_path);
        assert!(matches!(result.unwrap_err(), IpcError::NotRunning { .. }));
    }

    #[test]
    fn test_request_response_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&sock_path).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut writer = &stream;
            writer
                .write_all(b"{\"type\":\"ack\",\"id\":\"1\"}\n")
                .unwrap();
        });

        let mut conn = IpcConnection::connect(&sock_path).unwrap();
        let resp = conn
            .request(&ClientMessage::Ping { id: "1".to_string() })
            .unwrap();
        assert!(matches!(resp, DaemonMessage::Ack { .. }));
        server.join().unwrap();
    }

    #[test]
    fn test_request_skips_streaming_messages() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("test2.sock");
        let listener = UnixListener::bind(&sock_path).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut writer = &stream;
            writer
                .write_all(b"{\"type\":\"pty_output\",\"pane\":\"p\",\"data\":\"aGk=\"}\n")
                .unwrap();
            writer
                .write_all(b"{\"type\":\"ack\",\"id\":\"7\"}\n")
                .unwrap();
        });

        let mut conn = IpcConnection::connect(&sock_path).unwrap();
        let resp = conn
            .request(&ClientMessage::Ping { id: "7".to_string() })
            .unwrap();
        assert!(matches!(resp, DaemonMessage::Ack { .. }));
        server.join().unwrap();
    }

    #[test]
    fn test_request_propagates_daemon_error() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("test3.sock");
        let listener = UnixListener::bind(&sock_path).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut writer = &stream;
            writer
                .write_all(
                    b"{\"type\":\"error\",\"id\":\"1\",\"code\":\"pane_not_found\",\"message\":\"nope\"}\n",
                )
                .unwrap();
        });

        let mut conn = IpcConnection::connect(&sock_path).unwrap();
        let err = conn
            .request(&ClientMessage::Ping { id: "1".to_string() })
            .unwrap_err();
        assert!(matches!(
            err,
            IpcError::DaemonError {
                code: ErrorCode::PaneNotFound,
                ..
            }
        ));
        server.join().unwrap();
    }
}
