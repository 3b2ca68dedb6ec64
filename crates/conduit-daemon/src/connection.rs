use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use conduit_protocol::{ClientMessage, DaemonMessage, PaneName};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{read_client_message, write_daemon_message};
use crate::errors::DaemonError;
use crate::pane::manager::PaneManager;

type Writer = Mutex<tokio::io::WriteHalf<UnixStream>>;

/// Drive one client connection end to end: read requests, dispatch them
/// against the shared `PaneManager`, and write responses. A connection may
/// attach to at most one pane's output stream at a time; attaching spawns a
/// task that forwards broadcast PTY output until the client detaches,
/// re-attaches elsewhere, or the connection closes.
pub async fn handle_connection(
    stream: UnixStream,
    panes: Arc<RwLock<PaneManager>>,
    shutdown: CancellationToken,
) {
    let client_id = panes.write().await.next_client_id();
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let writer: Arc<Writer> = Arc::new(Mutex::new(write_half));

    let mut attach_task: Option<tokio::task::JoinHandle<()>> = None;
    let mut attached_pane: Option<PaneName> = None;

    loop {
        let msg = tokio::select! {
            result = read_client_message(&mut reader) => result,
            _ = shutdown.cancelled() => break,
        };

        let msg = match msg {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) => {
                warn!(event = "daemon.connection.read_failed", client_id = client_id, error = %e);
                break;
            }
        };

        let response = dispatch(
            msg,
            &panes,
            client_id,
            &writer,
            &shutdown,
            &mut attach_task,
            &mut attached_pane,
        )
        .await;

        if let Some(response) = response {
            let mut w = writer.lock().await;
            if let Err(e) = write_daemon_message(&mut *w, &response).await {
                warn!(event = "daemon.connection.write_failed", client_id = client_id, error = %e);
                break;
            }
        }
    }

    if let Some(task) = attach_task.take() {
        task.abort();
    }
    panes.write().await.detach_client_from_all(client_id);
    debug!(event = "daemon.connection.closed", client_id = client_id);
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    msg: ClientMessage,
    panes: &Arc<RwLock<PaneManager>>,
    client_id: u64,
    writer: &Arc<Writer>,
    shutdown: &CancellationToken,
    attach_task: &mut Option<tokio::task::JoinHandle<()>>,
    attached_pane: &mut Option<PaneName>,
) -> Option<DaemonMessage> {
    match msg {
        ClientMessage::CreatePane {
            id,
            pane,
            working_directory,
            command,
            args,
            env_vars,
            rows,
            cols,
        } => {
            let mut mgr = panes.write().await;
            match mgr.create_pane(&pane, &working_directory, &command, &args, &env_vars, rows, cols) {
                Ok(info) => Some(DaemonMessage::PaneCreated { id, pane: info }),
                Err(e) => Some(error_response(id, e)),
            }
        }

        ClientMessage::Attach { id, pane, rows, cols } => {
            let result = {
                let mut mgr = panes.write().await;
                let _ = mgr.resize_pty(&pane, rows, cols);
                mgr.attach_client(&pane, client_id)
            };

            match result {
                Ok((rx, scrollback)) => {
                    let ack = DaemonMessage::Ack { id };
                    {
                        let mut w = writer.lock().await;
                        if let Err(e) = write_daemon_message(&mut *w, &ack).await {
                            warn!(event = "daemon.connection.attach_ack_failed", pane = %pane, error = %e);
                            return None;
                        }
                    }

                    if !scrollback.is_empty() {
                        let replay = DaemonMessage::PtyOutput {
                            pane: pane.clone(),
                            data: BASE64.encode(&scrollback),
                        };
                        let mut w = writer.lock().await;
                        let _ = write_daemon_message(&mut *w, &replay).await;
                    }

                    if let Some(prev) = attach_task.take() {
                        prev.abort();
                    }
                    *attach_task = Some(tokio::spawn(forward_output(pane.clone(), rx, writer.clone())));
                    *attached_pane = Some(pane);
                    None
                }
                Err(e) => Some(error_response(id, e)),
            }
        }

        ClientMessage::Detach { id, pane } => {
            let mut mgr = panes.write().await;
            let _ = mgr.detach_client(&pane, client_id);
            drop(mgr);

            if attached_pane.as_ref() == Some(&pane) {
                if let Some(task) = attach_task.take() {
                    task.abort();
                }
                *attached_pane = None;
            }
            Some(DaemonMessage::Ack { id })
        }

        ClientMessage::ResizePty { id, pane, rows, cols } => {
            let mut mgr = panes.write().await;
            match mgr.resize_pty(&pane, rows, cols) {
                Ok(()) => Some(DaemonMessage::Ack { id }),
                Err(e) => Some(error_response(id, e)),
            }
        }

        ClientMessage::WriteStdin { id, pane, data } => match BASE64.decode(&data) {
            Ok(bytes) => {
                let mgr = panes.read().await;
                match mgr.write_stdin(&pane, &bytes) {
                    Ok(()) => Some(DaemonMessage::Ack { id }),
                    Err(e) => Some(error_response(id, e)),
                }
            }
            Err(e) => Some(error_response(id, DaemonError::from(e))),
        },

        ClientMessage::StopPane { id, pane } => {
            let mut mgr = panes.write().await;
            match mgr.stop_pane(&pane) {
                Ok(()) => Some(DaemonMessage::Ack { id }),
                Err(e) => Some(error_response(id, e)),
            }
        }

        ClientMessage::DestroyPane { id, pane, force } => {
            if attached_pane.as_ref() == Some(&pane) {
                if let Some(task) = attach_task.take() {
                    task.abort();
                }
                *attached_pane = None;
            }
            let mut mgr = panes.write().await;
            match mgr.destroy_pane(&pane, force) {
                Ok(()) => Some(DaemonMessage::Ack { id }),
                Err(e) => Some(error_response(id, e)),
            }
        }

        ClientMessage::ListPanes { id } => {
            let mgr = panes.read().await;
            Some(DaemonMessage::PaneList { id, panes: mgr.list_panes() })
        }

        ClientMessage::GetPane { id, pane } => {
            let mgr = panes.read().await;
            match mgr.get_pane(&pane) {
                Some(info) => Some(DaemonMessage::PaneInfo { id, pane: info }),
                None => Some(error_response(id, DaemonError::PaneNotFound(pane.to_string()))),
            }
        }

        ClientMessage::ReadScrollback { id, pane, tail_lines } => {
            let mgr = panes.read().await;
            match mgr.scrollback_contents(&pane) {
                Some(bytes) => {
                    let bytes = match tail_lines {
                        Some(n) => tail_lines_of(&bytes, n),
                        None => bytes,
                    };
                    Some(DaemonMessage::ScrollbackContents { id, data: BASE64.encode(&bytes) })
                }
                None => Some(error_response(id, DaemonError::PaneNotFound(pane.to_string()))),
            }
        }

        ClientMessage::DaemonStop { id } => {
            shutdown.cancel();
            Some(DaemonMessage::Ack { id })
        }

        ClientMessage::Ping { id } => Some(DaemonMessage::Ack { id }),
    }
}

fn error_response(id: String, err: DaemonError) -> DaemonMessage {
    DaemonMessage::Error { id, code: err.error_code(), message: err.to_string() }
}

/// Keep only the last `n` newline-delimited lines of raw scrollback bytes.
/// Scrollback is terminal output, not guaranteed valid UTF-8 at arbitrary
/// byte boundaries, so this is a best-effort trim rather than exact.
fn tail_lines_of(bytes: &[u8], n: usize) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n").into_bytes()
}

/// Forward broadcast PTY output to the client until the channel closes or
/// the connection write side fails.
async fn forward_output(pane: PaneName, mut rx: broadcast::Receiver<Vec<u8>>, writer: Arc<Writer>) {
    loop {
        match rx.recv().await {
            Ok(data) => {
                let msg = DaemonMessage::PtyOutput { pane: pane.clone(), data: BASE64.encode(&data) };
                let mut w = writer.lock().await;
                if write_daemon_message(&mut *w, &msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // `missed` counts dropped broadcast chunks, not raw bytes;
                // it's the closest estimate available without per-chunk
                // byte bookkeeping in the broadcaster.
                let msg = DaemonMessage::PtyOutputDropped { pane: pane.clone(), bytes_dropped: missed as usize };
                let mut w = writer.lock().await;
                let _ = write_daemon_message(&mut *w, &msg).await;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines_of_fewer_than_n() {
        let bytes = b"a\nb\nc".to_vec();
        assert_eq!(tail_lines_of(&bytes, 10), b"a\nb\nc".to_vec());
    }

    #[test]
    fn test_tail_lines_of_trims() {
        let bytes = b"a\nb\nc\nd".to_vec();
        assert_eq!(tail_lines_of(&bytes, 2), b"c\nd".to_vec());
    }

    #[test]
    fn test_tail_lines_of_zero() {
        let bytes = b"a\nb".to_vec();
        assert!(tail_lines_of(&bytes, 0).is_empty());
    }
}
