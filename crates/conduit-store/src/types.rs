use serde::{Deserialize, Serialize};

/// Reserved project id that absorbs sessions/dev-servers orphaned by
/// migrations and cannot itself be deleted.
pub const UNCATEGORIZED_PROJECT_ID: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub working_directory: String,
    pub agent_type: String,
    pub default_model: Option<String>,
    pub expanded: bool,
    pub sort_order: i64,
    pub is_uncategorized: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevServerType {
    Node,
    Docker,
}

impl DevServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevServerType::Node => "node",
            DevServerType::Docker => "docker",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "node" => Some(DevServerType::Node),
            "docker" => Some(DevServerType::Docker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDevServerTemplate {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub server_type: DevServerType,
    pub command: String,
    pub port: Option<i64>,
    pub port_env_var: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Waiting,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(SessionStatus::Idle),
            "running" => Some(SessionStatus::Running),
            "waiting" => Some(SessionStatus::Waiting),
            "error" => Some(SessionStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Merged,
    Closed,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "open",
            PrStatus::Merged => "merged",
            PrStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(PrStatus::Open),
            "merged" => Some(PrStatus::Merged),
            "closed" => Some(PrStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Pending => "pending",
            WorkerStatus::Running => "running",
            WorkerStatus::Completed => "completed",
            WorkerStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(WorkerStatus::Pending),
            "running" => Some(WorkerStatus::Running),
            "completed" => Some(WorkerStatus::Completed),
            "failed" => Some(WorkerStatus::Failed),
            _ => None,
        }
    }
}

/// All-or-nothing worktree fields bound to a session (invariant 2 in §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeBinding {
    pub worktree_path: String,
    pub branch_name: String,
    pub base_branch: String,
    pub dev_server_port: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub status: SessionStatus,
    pub working_directory: String,
    pub agent_type: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub tmux_name: Option<String>,
    pub project_id: String,
    pub parent_session_id: Option<String>,
    pub claude_session_id: Option<String>,
    pub auto_approve: bool,
    pub worktree: Option<WorktreeBinding>,
    pub pr_url: Option<String>,
    pub pr_number: Option<i64>,
    pub pr_status: Option<PrStatus>,
    pub conductor_session_id: Option<String>,
    pub worker_task: Option<String>,
    pub worker_status: Option<WorkerStatus>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevServerStatus {
    Stopped,
    Starting,
    Running,
    Failed,
}

impl DevServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevServerStatus::Stopped => "stopped",
            DevServerStatus::Starting => "starting",
            DevServerStatus::Running => "running",
            DevServerStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stopped" => Some(DevServerStatus::Stopped),
            "starting" => Some(DevServerStatus::Starting),
            "running" => Some(DevServerStatus::Running),
            "failed" => Some(DevServerStatus::Failed),
            _ => None,
        }
    }

    /// Whether a dev server in this status is considered "live" for the
    /// purposes of port-uniqueness checks (invariant 3 in §3).
    pub fn is_live(&self) -> bool {
        matches!(self, DevServerStatus::Starting | DevServerStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServerInstance {
    pub id: String,
    pub project_id: String,
    pub server_type: DevServerType,
    pub name: String,
    pub command: String,
    pub status: DevServerStatus,
    pub pid: Option<i64>,
    pub container_id: Option<String>,
    pub ports: Vec<i64>,
    pub working_directory: String,
}

pub(crate) fn encode_ports(ports: &[i64]) -> String {
    serde_json::to_string(ports).expect("ports serialize")
}

pub(crate) fn decode_ports(raw: &str) -> Vec<i64> {
    serde_json::from_str(raw).unwrap_or_default()
}
