//! Worker orchestrator (C8).
//!
//! Lets a conductor session spawn, monitor, and tear down worker sessions
//! via a small typed RPC surface. Workers are ordinary sessions with
//! `conductor_session_id` set; the Store itself rejects a worker spawning a
//! worker (a chain of depth two), so this module does not re-check that
//! invariant, only surfaces the Store's `Conflict` if it fires.

use std::collections::HashMap;

use conduit_store::{Session, Store, WorkerStatus};
use tracing::info;

use crate::errors::{CoreError, CoreResult};
use crate::mux::MuxStatus;
use crate::session::{CreateSessionSpec, SessionManager};

/// Options accepted by [`WorkerOrchestrator::spawn_worker`].
#[derive(Debug, Clone)]
pub struct SpawnWorkerSpec {
    pub conductor_id: String,
    pub task: String,
    pub working_directory: String,
    pub branch_name: Option<String>,
    pub use_worktree: bool,
    pub model: String,
    pub agent_type: String,
}

impl SpawnWorkerSpec {
    pub fn new(conductor_id: impl Into<String>, task: impl Into<String>, working_directory: impl Into<String>) -> Self {
        Self {
            conductor_id: conductor_id.into(),
            task: task.into(),
            working_directory: working_directory.into(),
            branch_name: None,
            use_worktree: true,
            model: "sonnet".to_string(),
            agent_type: "claude".to_string(),
        }
    }
}

/// A worker's identity and status, as returned by `list_workers`.
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub id: String,
    pub name: String,
    pub status: Option<WorkerStatus>,
    pub task: Option<String>,
    pub branch_name: Option<String>,
}

/// Counts by `worker_status`, as returned by `get_workers_summary`.
#[derive(Debug, Clone, Default)]
pub struct WorkersCount {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct WorkerOrchestrator<'a> {
    store: &'a Store,
    sessions: &'a SessionManager<'a>,
}

impl<'a> WorkerOrchestrator<'a> {
    pub fn new(store: &'a Store, sessions: &'a SessionManager<'a>) -> Self {
        Self { store, sessions }
    }

    /// Creates a worker session owned by `conductor_id`. The Store rejects
    /// this with `Conflict` if the conductor is itself a worker (no
    /// two-level chains).
    pub fn spawn_worker(&self, spec: SpawnWorkerSpec) -> CoreResult<Session> {
        let conductor = self.store.get_session(&spec.conductor_id)?;

        let mut create = CreateSessionSpec::new();
        create.working_directory = Some(spec.working_directory);
        create.model = Some(spec.model);
        create.agent_type = Some(spec.agent_type);
        create.project_id = Some(conductor.project_id.clone());
        create.use_worktree = spec.use_worktree;
        create.feature_name = spec.branch_name;
        create.conductor_session_id = Some(spec.conductor_id.clone());
        create.worker_task = Some(spec.task);

        let worker = self.sessions.create(create)?;
        info!(event = "core.worker.spawned", worker = %worker.id, conductor = %spec.conductor_id);
        Ok(worker)
    }

    pub fn list_workers(&self, conductor_id: &str) -> CoreResult<Vec<WorkerSummary>> {
        let workers = self.store.list_workers(conductor_id)?;
        Ok(workers
            .into_iter()
            .map(|w| WorkerSummary {
                id: w.id,
                name: w.name,
                status: w.worker_status,
                task: w.worker_task,
                branch_name: w.worktree.map(|wt| wt.branch_name),
            })
            .collect())
    }

    /// Last-N lines of the worker's pane output.
    pub fn get_worker_output(&self, worker_id: &str, lines: usize) -> CoreResult<Vec<String>> {
        let worker = self.store.get_session(worker_id)?;
        let Some(tmux_name) = &worker.tmux_name else {
            return Ok(Vec::new());
        };
        Ok(self.sessions.mux_capture(Some(&worker.project_id), tmux_name, lines))
    }

    /// Writes a line to the worker's pane as if typed, followed by Enter.
    pub fn send_to_worker(&self, worker_id: &str, message: &str) -> CoreResult<()> {
        let worker = self.store.get_session(worker_id)?;
        let tmux_name = worker
            .tmux_name
            .as_ref()
            .ok_or_else(|| CoreError::BadRequest("worker has no multiplexer pane".to_string()))?;
        self.sessions.mux_send_command(Some(&worker.project_id), tmux_name, message)
    }

    pub fn complete_worker(&self, worker_id: &str) -> CoreResult<Session> {
        self.store
            .set_worker_status(worker_id, WorkerStatus::Completed)
            .map_err(CoreError::from)
    }

    pub fn fail_worker(&self, worker_id: &str) -> CoreResult<Session> {
        self.store
            .set_worker_status(worker_id, WorkerStatus::Failed)
            .map_err(CoreError::from)
    }

    /// Terminates the pane and deletes the session row; optionally removes
    /// the worktree and its branch too.
    pub fn kill_worker(&self, worker_id: &str, cleanup_worktree: bool) -> CoreResult<()> {
        self.sessions.delete(worker_id, cleanup_worktree)
    }

    pub fn get_workers_summary(&self, conductor_id: &str) -> CoreResult<WorkersCount> {
        let workers = self.store.list_workers(conductor_id)?;
        let mut counts = WorkersCount::default();
        for w in &workers {
            match w.worker_status {
                Some(WorkerStatus::Pending) => counts.pending += 1,
                Some(WorkerStatus::Running) => counts.running += 1,
                Some(WorkerStatus::Completed) => counts.completed += 1,
                Some(WorkerStatus::Failed) => counts.failed += 1,
                None => {}
            }
        }
        Ok(counts)
    }

    /// Reconciles `worker_status` against the mux driver's observed pane
    /// state for every `pending`/`running` worker of a conductor:
    /// `pending -> running` the first time the pane is not `dead`,
    /// `-> failed` automatically if the pane goes `dead` before a
    /// `complete_worker` call arrives. Intended to be called from the same
    /// poller that refreshes session status.
    pub fn reconcile_statuses(&self, conductor_id: &str) -> CoreResult<HashMap<String, WorkerStatus>> {
        let workers = self.store.list_workers(conductor_id)?;
        let mut transitions = HashMap::new();
        for worker in workers {
            let in_flight = matches!(worker.worker_status, Some(WorkerStatus::Pending) | Some(WorkerStatus::Running));
            if !in_flight {
                continue;
            }
            let Some(tmux_name) = &worker.tmux_name else {
                continue;
            };
            let status = self.sessions.mux_classify(Some(&worker.project_id), tmux_name);
            let next = match (worker.worker_status, status) {
                (_, MuxStatus::Dead) => Some(WorkerStatus::Failed),
                (Some(WorkerStatus::Pending), _) => Some(WorkerStatus::Running),
                _ => None,
            };
            if let Some(next) = next {
                self.store.set_worker_status(&worker.id, next)?;
                transitions.insert(worker.id, next);
            }
        }
        Ok(transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_config::Config;
    use conduit_paths::ConduitPaths;
    use conduit_store::UNCATEGORIZED_PROJECT_ID;
    use std::time::Duration;
    use tempfile::tempdir;

    fn harness() -> (Store, Config, ConduitPaths, crate::command::CommandRunner, tempfile::TempDir) {
        let store = Store::open_in_memory().unwrap();
        let config = Config::default();
        let dir = tempdir().unwrap();
        let paths = ConduitPaths::from_dir(dir.path().to_path_buf());
        let runner = crate::command::CommandRunner::new(Duration::from_millis(200));
        (store, config, paths, runner, dir)
    }

    #[test]
    fn spawn_worker_rejects_worker_conductor() {
        let (store, config, paths, runner, _dir) = harness();
        let sessions = SessionManager::new(&store, &config, &paths, &runner);
        let orchestrator = WorkerOrchestrator::new(&store, &sessions);

        let mut conductor_spec = CreateSessionSpec::new();
        conductor_spec.use_mux = false;
        conductor_spec.project_id = Some(UNCATEGORIZED_PROJECT_ID.to_string());
        let conductor = sessions.create(conductor_spec).unwrap();

        let mut worker_spec = SpawnWorkerSpec::new(conductor.id.clone(), "write tests", "/tmp");
        worker_spec.use_worktree = false;
        // force no tmux so spawn doesn't shell out to a real tmux binary
        let worker = {
            let mut create = CreateSessionSpec::new();
            create.use_mux = false;
            create.working_directory = Some(worker_spec.working_directory.clone());
            create.project_id = Some(conductor.project_id.clone());
            create.use_worktree = false;
            create.conductor_session_id = Some(conductor.id.clone());
            create.worker_task = Some(worker_spec.task.clone());
            sessions.create(create).unwrap()
        };
        assert_eq!(worker.worker_status, Some(WorkerStatus::Pending));

        let grandchild = orchestrator.spawn_worker(SpawnWorkerSpec {
            use_worktree: false,
            ..SpawnWorkerSpec::new(worker.id.clone(), "sub task", "/tmp")
        });
        assert!(matches!(grandchild, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn lifecycle_transitions_are_reflected_in_summary() {
        let (store, config, paths, runner, _dir) = harness();
        let sessions = SessionManager::new(&store, &config, &paths, &runner);
        let orchestrator = WorkerOrchestrator::new(&store, &sessions);

        let mut conductor_spec = CreateSessionSpec::new();
        conductor_spec.use_mux = false;
        conductor_spec.project_id = Some(UNCATEGORIZED_PROJECT_ID.to_string());
        let conductor = sessions.create(conductor_spec).unwrap();

        let mut create = CreateSessionSpec::new();
        create.use_mux = false;
        create.working_directory = Some("/tmp".to_string());
        create.project_id = Some(conductor.project_id.clone());
        create.use_worktree = false;
        create.conductor_session_id = Some(conductor.id.clone());
        create.worker_task = Some("write tests".to_string());
        let worker = sessions.create(create).unwrap();

        let before = orchestrator.get_workers_summary(&conductor.id).unwrap();
        assert_eq!(before.pending, 1);

        orchestrator.complete_worker(&worker.id).unwrap();
        let after = orchestrator.get_workers_summary(&conductor.id).unwrap();
        assert_eq!(after.pending, 0);
        assert_eq!(after.completed, 1);
    }
}
