use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{PaneName, PtyInfo};

/// Error codes returned by the daemon in error responses.
///
/// Maps 1:1 with `DaemonError` variants on the server side. Unknown codes
/// from a future daemon version deserialize to `Unknown` via `#[serde(other)]`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    PaneNotFound,
    PaneAlreadyExists,
    PaneNotRunning,
    InvalidStateTransition,
    PtyError,
    DaemonAlreadyRunning,
    ShutdownTimeout,
    DaemonNotRunning,
    ConnectionFailed,
    ProtocolError,
    IoError,
    SerializationError,
    Base64DecodeError,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.to_string()))
            .unwrap_or(ErrorCode::Unknown)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::PaneNotFound => write!(f, "pane_not_found"),
            ErrorCode::PaneAlreadyExists => write!(f, "pane_already_exists"),
            ErrorCode::PaneNotRunning => write!(f, "pane_not_running"),
            ErrorCode::InvalidStateTransition => write!(f, "invalid_state_transition"),
            ErrorCode::PtyError => write!(f, "pty_error"),
            ErrorCode::DaemonAlreadyRunning => write!(f, "daemon_already_running"),
            ErrorCode::ShutdownTimeout => write!(f, "shutdown_timeout"),
            ErrorCode::DaemonNotRunning => write!(f, "daemon_not_running"),
            ErrorCode::ConnectionFailed => write!(f, "connection_failed"),
            ErrorCode::ProtocolError => write!(f, "protocol_error"),
            ErrorCode::IoError => write!(f, "io_error"),
            ErrorCode::SerializationError => write!(f, "serialization_error"),
            ErrorCode::Base64DecodeError => write!(f, "base64_decode_error"),
            ErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

fn default_rows() -> u16 {
    24
}

fn default_cols() -> u16 {
    80
}

/// Client -> Daemon request messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// All requests carry an `id` field for response correlation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Spawn a PTY running `command` in `working_directory`.
    ///
    /// The daemon does not know about mux panes, worktrees or agents — it
    /// just spawns a process inside a PTY. The caller (the mux driver, C3)
    /// decides whether `command` is a `tmux new-session` invocation or a
    /// bare `tmux attach` used to join one.
    #[serde(rename = "create_pane")]
    CreatePane {
        id: String,
        pane: PaneName,
        working_directory: String,
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env_vars: HashMap<String, String>,
        #[serde(default = "default_rows")]
        rows: u16,
        #[serde(default = "default_cols")]
        cols: u16,
    },

    #[serde(rename = "attach")]
    Attach {
        id: String,
        pane: PaneName,
        rows: u16,
        cols: u16,
    },

    #[serde(rename = "detach")]
    Detach { id: String, pane: PaneName },

    #[serde(rename = "resize_pty")]
    ResizePty {
        id: String,
        pane: PaneName,
        rows: u16,
        cols: u16,
    },

    #[serde(rename = "write_stdin")]
    WriteStdin {
        id: String,
        pane: PaneName,
        /// Base64-encoded bytes to write to PTY stdin.
        data: String,
    },

    #[serde(rename = "stop_pane")]
    StopPane { id: String, pane: PaneName },

    #[serde(rename = "destroy_pane")]
    DestroyPane {
        id: String,
        pane: PaneName,
        #[serde(default)]
        force: bool,
    },

    #[serde(rename = "list_panes")]
    ListPanes { id: String },

    #[serde(rename = "get_pane")]
    GetPane { id: String, pane: PaneName },

    #[serde(rename = "read_scrollback")]
    ReadScrollback {
        id: String,
        pane: PaneName,
        #[serde(default)]
        tail_lines: Option<usize>,
    },

    #[serde(rename = "daemon_stop")]
    DaemonStop { id: String },

    #[serde(rename = "ping")]
    Ping { id: String },
}

/// Daemon -> Client response and streaming messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// Response messages echo the request `id`. Streaming messages have no `id`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonMessage {
    #[serde(rename = "pane_created")]
    PaneCreated { id: String, pane: PtyInfo },

    /// Streaming PTY output. No `id` — pushed after attach.
    #[serde(rename = "pty_output")]
    PtyOutput {
        pane: PaneName,
        /// Base64-encoded raw PTY output bytes.
        data: String,
    },

    /// Notification that PTY output was dropped for a slow client.
    #[serde(rename = "pty_output_dropped")]
    PtyOutputDropped { pane: PaneName, bytes_dropped: usize },

    /// Pane state change notification. No `id`.
    #[serde(rename = "pane_event")]
    PaneEvent {
        event: String,
        pane: PaneName,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },

    #[serde(rename = "pane_list")]
    PaneList { id: String, panes: Vec<PtyInfo> },

    #[serde(rename = "pane_info")]
    PaneInfo { id: String, pane: PtyInfo },

    #[serde(rename = "scrollback_contents")]
    ScrollbackContents {
        id: String,
        /// Base64-encoded raw scrollback bytes.
        data: String,
    },

    #[serde(rename = "error")]
    Error {
        id: String,
        code: ErrorCode,
        message: String,
    },

    #[serde(rename = "ack")]
    Ack { id: String },
}

impl ClientMessage {
    /// Extract the request ID from any client message.
    pub fn id(&self) -> &str {
        match self {
            ClientMessage::CreatePane { id, .. }
            | ClientMessage::Attach { id, .. }
            | ClientMessage::Detach { id, .. }
            | ClientMessage::ResizePty { id, .. }
            | ClientMessage::WriteStdin { id, .. }
            | ClientMessage::StopPane { id, .. }
            | ClientMessage::DestroyPane { id, .. }
            | ClientMessage::ListPanes { id, .. }
            | ClientMessage::GetPane { id, .. }
            | ClientMessage::ReadScrollback { id, .. }
            | ClientMessage::DaemonStop { id, .. }
            | ClientMessage::Ping { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PtyStatus;

    #[test]
    fn test_client_message_create_pane_roundtrip() {
        let msg = ClientMessage::CreatePane {
            id: "req-001".to_string(),
            pane: PaneName::new("claude-sess1"),
            working_directory: "/tmp/worktrees/add-dark-mode".to_string(),
            command: "tmux".to_string(),
            args: vec!["new-session".to_string()],
            env_vars: HashMap::from([("CONDUIT_SESSION".to_string(), "sess1".to_string())]),
            rows: 24,
            cols: 80,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"create_pane"#));
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), "req-001");
    }

    #[test]
    fn test_client_message_defaults() {
        let json = r#"{"id":"1","type":"create_pane","pane":"s","working_directory":"/tmp","command":"bash"}"#;
        let parsed: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::CreatePane {
            args,
            env_vars,
            rows,
            cols,
            ..
        } = parsed
        {
            assert!(args.is_empty());
            assert!(env_vars.is_empty());
            assert_eq!(rows, 24);
            assert_eq!(cols, 80);
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn test_daemon_message_error_roundtrip() {
        let msg = DaemonMessage::Error {
            id: "req-001".to_string(),
            code: ErrorCode::PaneNotFound,
            message: "no pane 'claude-sess1'".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""code":"pane_not_found""#));
        let parsed: DaemonMessage = serde_json::from_str(&json).unwrap();
        if let DaemonMessage::Error { code, .. } = parsed {
            assert_eq!(code, ErrorCode::PaneNotFound);
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn test_error_code_unknown_deserialization() {
        let json = r#"{"type":"error","id":"1","code":"some_future_error","message":"new"}"#;
        let parsed: DaemonMessage = serde_json::from_str(json).unwrap();
        if let DaemonMessage::Error { code, .. } = parsed {
            assert_eq!(code, ErrorCode::Unknown);
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn test_all_client_variants_roundtrip() {
        let messages: Vec<ClientMessage> = vec![
            ClientMessage::CreatePane {
                id: "1".into(),
                pane: PaneName::new("s"),
                working_directory: "/tmp".into(),
                command: "bash".into(),
                args: vec![],
                env_vars: HashMap::new(),
                rows: 24,
                cols: 80,
            },
            ClientMessage::Attach {
                id: "2".into(),
                pane: PaneName::new("s"),
                rows: 24,
                cols: 80,
            },
            ClientMessage::Detach {
                id: "3".into(),
                pane: PaneName::new("s"),
            },
            ClientMessage::ResizePty {
                id: "4".into(),
                pane: PaneName::new("s"),
                rows: 40,
                cols: 120,
            },
            ClientMessage::WriteStdin {
                id: "5".into(),
                pane: PaneName::new("s"),
                data: "dGVzdA==".into(),
            },
            ClientMessage::StopPane {
                id: "6".into(),
                pane: PaneName::new("s"),
            },
            ClientMessage::DestroyPane {
                id: "7".into(),
                pane: PaneName::new("s"),
                force: true,
            },
            ClientMessage::ListPanes { id: "8".into() },
            ClientMessage::GetPane {
                id: "9".into(),
                pane: PaneName::new("s"),
            },
            ClientMessage::ReadScrollback {
                id: "9b".into(),
                pane: PaneName::new("s"),
                tail_lines: Some(20),
            },
            ClientMessage::DaemonStop { id: "10".into() },
            ClientMessage::Ping { id: "11".into() },
        ];
        for msg in messages {
            let json = serde_json::to_string(&msg).unwrap();
            let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed.id(), msg.id());
        }
    }

    #[test]
    fn test_pane_created_roundtrip() {
        let msg = DaemonMessage::PaneCreated {
            id: "req-1".into(),
            pane: PtyInfo {
                pane: PaneName::new("claude-sess1"),
                working_directory: "/tmp/wt".into(),
                command: "tmux".into(),
                status: PtyStatus::Running,
                created_at: "2026-02-09T14:30:00Z".into(),
                client_count: None,
                pid: None,
                exit_code: None,
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: DaemonMessage = serde_json::from_str(&json).unwrap();
        if let DaemonMessage::PaneCreated { pane, .. } = parsed {
            assert_eq!(pane.command, "tmux");
        } else {
            panic!("wrong variant");
        }
    }
}
