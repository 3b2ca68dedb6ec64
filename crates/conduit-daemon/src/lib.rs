pub mod codec;
pub mod config;
pub mod connection;
pub mod errors;
pub mod logging;
pub mod pane;
pub mod pid;
pub mod pty;
pub mod server;

pub use conduit_protocol::{ClientMessage, DaemonMessage};
pub use config::{DaemonConfig, DaemonStatus, load_daemon_config};
pub use errors::DaemonError;
pub use server::run_server;
