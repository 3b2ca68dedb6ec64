use serde::{Deserialize, Serialize};

/// Generate a newtype wrapper around `String` with standard trait impls.
///
/// Each generated type gets: `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`,
/// `Serialize`/`Deserialize` (transparent), `Display`, `Deref<Target=str>`,
/// `AsRef<str>`, `Borrow<str>`, `From<String>`, `From<&str>`.
macro_rules! newtype_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

newtype_string! {
    /// Unique identifier for a session (e.g., `"sess_9f2c"`).
    SessionId
}

newtype_string! {
    /// User-facing feature branch name for a worktree session (e.g., `"add-dark-mode"`).
    ///
    /// This is the human string, not the derived git ref (`"feature/add-dark-mode"`).
    BranchName
}

newtype_string! {
    /// Project identifier. The reserved id `"uncategorized"` always exists.
    ProjectId
}

newtype_string! {
    /// Mux pane identifier, derived from `agent_type` and session id (`"claude-sess_9f2c"`).
    PaneName
}

newtype_string! {
    /// Identifier of a dev-server instance.
    DevServerId
}

/// Agent backend a session is driven by. Closed set validated at the core boundary.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Claude,
    Amp,
    Opencode,
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::Claude => write!(f, "claude"),
            AgentType::Amp => write!(f, "amp"),
            AgentType::Opencode => write!(f, "opencode"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(AgentType::Claude),
            "amp" => Ok(AgentType::Amp),
            "opencode" => Ok(AgentType::Opencode),
            other => Err(format!(
                "invalid agent type '{other}', expected one of: claude, amp, opencode"
            )),
        }
    }
}

/// Derived status of a session, as surfaced by the session manager.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Waiting,
    Error,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Waiting => write!(f, "waiting"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

/// Heuristic classification of a mux pane's trailing output, reported by the
/// mux driver (C3). `Dead` means the pane no longer exists.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuxPaneStatus {
    Idle,
    Running,
    Waiting,
    Error,
    Dead,
}

impl MuxPaneStatus {
    /// Map a pane classification onto the session-level status set.
    /// `Dead` has no session-status counterpart; callers decide separately
    /// whether a dead pane means `error` or simply "not attached".
    pub fn to_session_status(self) -> Option<SessionStatus> {
        match self {
            MuxPaneStatus::Idle => Some(SessionStatus::Idle),
            MuxPaneStatus::Running => Some(SessionStatus::Running),
            MuxPaneStatus::Waiting => Some(SessionStatus::Waiting),
            MuxPaneStatus::Error => Some(SessionStatus::Error),
            MuxPaneStatus::Dead => None,
        }
    }
}

/// PR lifecycle as tracked on a session.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Merged,
    Closed,
}

/// Status of a session acting as a worker on behalf of a conductor.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Lifecycle status of a PTY owned directly by the daemon (the terminal
/// gateway's attach process, not the agent process inside the mux pane).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtyStatus {
    Starting,
    Running,
    Stopped,
}

/// Status of a project dev server.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevServerStatus {
    Stopped,
    Starting,
    Running,
    Failed,
}

/// Kind of a configured dev server.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevServerType {
    Node,
    Docker,
}

/// Summary of a live PTY as reported by the daemon over IPC.
///
/// A wire type for the terminal-gateway protocol, not the internal
/// `DaemonSession`. The daemon knows about PTYs, not about worktrees,
/// branches or agents — those concepts live in `conduit-core`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtyInfo {
    pub pane: PaneName,
    pub working_directory: String,
    pub command: String,
    pub status: PtyStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_info_serde() {
        let info = PtyInfo {
            pane: PaneName::new("claude-sess_1"),
            working_directory: "/tmp/worktrees/add-dark-mode".to_string(),
            command: "tmux attach -t claude-sess_1".to_string(),
            status: PtyStatus::Running,
            created_at: "2026-02-09T14:30:00Z".to_string(),
            client_count: Some(2),
            pid: Some(12345),
            exit_code: None,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains(r#""status":"running""#));
        let parsed: PtyInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.pane, info.pane);
        assert_eq!(parsed.client_count, Some(2));
    }

    #[test]
    fn test_pty_info_optional_fields_omitted() {
        let info = PtyInfo {
            pane: PaneName::new("test"),
            working_directory: "/tmp".to_string(),
            command: "bash".to_string(),
            status: PtyStatus::Stopped,
            created_at: "2026-02-09T14:30:00Z".to_string(),
            client_count: None,
            pid: None,
            exit_code: None,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("client_count"));
        assert!(!json.contains("pid"));
        assert!(!json.contains("exit_code"));
    }

    #[test]
    fn test_mux_status_to_session_status() {
        assert_eq!(
            MuxPaneStatus::Idle.to_session_status(),
            Some(SessionStatus::Idle)
        );
        assert_eq!(MuxPaneStatus::Dead.to_session_status(), None);
    }

    #[test]
    fn test_agent_type_roundtrip() {
        for (s, a) in [
            ("claude", AgentType::Claude),
            ("amp", AgentType::Amp),
            ("opencode", AgentType::Opencode),
        ] {
            assert_eq!(s.parse::<AgentType>().unwrap(), a);
            assert_eq!(a.to_string(), s);
        }
        assert!("nonexistent".parse::<AgentType>().is_err());
    }

    macro_rules! test_newtype {
        ($name:ident, $ty:ty) => {
            mod $name {
                use super::super::*;
                use std::collections::{HashMap, HashSet};

                #[test]
                fn serde_transparent_roundtrip() {
                    let val = <$ty>::new("test-value");
                    let json = serde_json::to_string(&val).unwrap();
                    assert_eq!(json, r#""test-value""#);
                    let parsed: $ty = serde_json::from_str(&json).unwrap();
                    assert_eq!(parsed, val);
                }

                #[test]
                fn deref_to_str() {
                    let val = <$ty>::new("abc");
                    let s: &str = &val;
                    assert_eq!(s, "abc");
                }

                #[test]
                fn hash_set() {
                    let mut set = HashSet::new();
                    set.insert(<$ty>::new("a"));
                    set.insert(<$ty>::new("b"));
                    set.insert(<$ty>::new("a"));
                    assert_eq!(set.len(), 2);
                }

                #[test]
                fn borrow_str_hashmap_lookup() {
                    let mut map = HashMap::new();
                    map.insert(<$ty>::new("key"), 42);
                    assert_eq!(map.get("key"), Some(&42));
                }
            }
        };
    }

    test_newtype!(session_id, SessionId);
    test_newtype!(branch_name, BranchName);
    test_newtype!(project_id, ProjectId);
    test_newtype!(pane_name, PaneName);
}
