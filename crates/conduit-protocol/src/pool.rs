//! Thread-local IPC connection pool.
//!
//! Caches at most one [`IpcConnection`] per thread to avoid opening a new
//! socket connection for every daemon operation. Matters for high-frequency
//! callers like keystroke forwarding in the terminal gateway.
//!
//! **Single-path invariant:** the pool does not track which socket path a
//! cached connection belongs to. Each process is expected to call [`take()`]
//! with the same `socket_path` for the lifetime of the thread, which holds
//! in practice — one daemon socket per process.

use std::cell::RefCell;
use std::path::Path;

use crate::{IpcConnection, IpcError};

thread_local! {
    static CACHED: RefCell<Option<IpcConnection>> = const { RefCell::new(None) };
}

/// Take a connection from the pool, or create a fresh one.
///
/// Returns `(connection, reused)`. Callers use `reused` to decide whether
/// to emit their own tracing events for cache hits vs. fresh dials.
pub fn take(socket_path: &Path) -> Result<(IpcConnection, bool), IpcError> {
    CACHED.with(|cell| {
        let mut cached = cell.borrow_mut();
        if let Some(conn) = cached.take()
            && conn.is_alive()
        {
            return Ok((conn, true));
        }
        let conn = IpcConnection::connect(socket_path)?;
        Ok((conn, false))
    })
}

/// Return a connection to the pool for reuse.
///
/// Re-validates liveness before caching. Returns `true` if the connection
/// was cached, `false` if it was dropped due to a failed liveness check.
pub fn release(conn: IpcConnection) -> bool {
    if !conn.is_alive() {
        return false;
    }
    CACHED.with(|cell| {
        *cell.borrow_mut() = Some(conn);
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;

    #[test]
    fn test_take_creates_fresh_connection() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("test.sock");
        let _listener = UnixListener::bind(&sock_path).unwrap();

        let (conn, reused) = take(&sock_path).unwrap();
        assert!(conn.is_alive());
        assert!(!reused);
    }

    #[test]
    fn test_take_returns_missing_socket_error() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("nonexistent.sock");
        let result = take(&sock_path);
        assert!(matches!(result.unwrap_err(), IpcError::NotRunning { .. }));
    }
}
