#[cfg(unix)]
pub mod client;
mod messages;
#[cfg(unix)]
pub mod pool;
mod types;

#[cfg(unix)]
pub use client::{IpcConnection, IpcError};
pub use messages::{ClientMessage, DaemonMessage, ErrorCode};
pub use types::{
    AgentType, BranchName, DevServerId, DevServerStatus, DevServerType, MuxPaneStatus, PaneName,
    PrStatus, ProjectId, PtyInfo, PtyStatus, SessionId, SessionStatus, WorkerStatus,
};
