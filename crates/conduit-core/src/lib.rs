//! # conduit-core
//!
//! Synchronous orchestration library: the external-command runner, the
//! multiplexer driver, the port allocator, the session manager, the
//! dev-server supervisor, and the worker orchestrator. Deliberately free of
//! an async runtime — every operation here is a bounded, blocking call to a
//! local subprocess or the Store, which is what lets the CLI link against
//! this crate directly instead of going through the daemon. Only the
//! terminal gateway's PTY streaming needs an async runtime, and that lives
//! in `conduit-daemon` instead.

mod bootstrap_runner;
mod command;
mod devserver;
mod errors;
mod mux;
mod ports;
mod session;
mod worker;

pub use bootstrap_runner::CommandStepRunner;
pub use command::{CommandError, CommandOutput, CommandRunner, RunningCommand};
pub use devserver::{DevServerSupervisor, StartDevServerSpec};
pub use errors::{CoreError, CoreResult};
pub use mux::{MuxDriver, MuxStatus, PaneSummary};
pub use ports::allocate_port;
pub use session::{CreateSessionSpec, SessionManager};
pub use worker::{SpawnWorkerSpec, WorkerOrchestrator, WorkerSummary, WorkersCount};
