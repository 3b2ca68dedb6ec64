//! Session manager (C6).
//!
//! The central orchestration surface: creates sessions (optionally forking,
//! optionally backed by a worktree + mux pane + allocated port), renames
//! and moves them, deletes them (tearing down what it allocated), and
//! upserts their PR status. Session creation is serialized per project key,
//! sharing the external-command runner's lock, to preserve the
//! `tmux_name`/port/branch uniqueness invariants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use conduit_config::Config;
use conduit_paths::ConduitPaths;
use conduit_store::{NewSession, PrStatus as StorePrStatus, Session, SessionStatus, Store, WorktreeBinding};
use tracing::{info, warn};

use crate::bootstrap_runner::CommandStepRunner;
use crate::command::CommandRunner;
use crate::errors::{CoreError, CoreResult};
use crate::mux::MuxDriver;
use crate::ports::allocate_port;

/// Recognized options for [`SessionManager::create`], mirroring the
/// `create(spec)` option set.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionSpec {
    pub name: Option<String>,
    pub working_directory: Option<String>,
    pub parent_session_id: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub agent_type: Option<String>,
    pub project_id: Option<String>,
    pub auto_approve: bool,
    pub use_worktree: bool,
    pub feature_name: Option<String>,
    pub base_branch: Option<String>,
    pub use_mux: bool,
    pub claude_session_id: Option<String>,
    pub initial_prompt: Option<String>,
    pub conductor_session_id: Option<String>,
    pub worker_task: Option<String>,
}

impl CreateSessionSpec {
    pub fn new() -> Self {
        Self {
            use_mux: true,
            ..Default::default()
        }
    }
}

pub struct SessionManager<'a> {
    store: &'a Store,
    config: &'a Config,
    paths: &'a ConduitPaths,
    command_runner: &'a CommandRunner,
}

impl<'a> SessionManager<'a> {
    pub fn new(
        store: &'a Store,
        config: &'a Config,
        paths: &'a ConduitPaths,
        command_runner: &'a CommandRunner,
    ) -> Self {
        Self {
            store,
            config,
            paths,
            command_runner,
        }
    }

    fn mux(&self) -> MuxDriver<'_> {
        MuxDriver::new(self.command_runner)
    }

    /// Exposes pane capture to callers (the worker orchestrator) that need
    /// to read a session's terminal output without re-deriving a driver.
    pub fn mux_capture(&self, project_id: Option<&str>, tmux_name: &str, tail_lines: usize) -> Vec<String> {
        self.mux().capture(project_id, tmux_name, tail_lines)
    }

    /// Exposes sending a line to a pane, for the worker orchestrator's
    /// `send_to_worker`.
    pub fn mux_send_command(&self, project_id: Option<&str>, tmux_name: &str, line: &str) -> CoreResult<()> {
        self.mux().send_command(project_id, tmux_name, line)
    }

    /// Exposes status classification, for the worker orchestrator's
    /// pending/running/failed reconciliation.
    pub fn mux_classify(&self, project_id: Option<&str>, tmux_name: &str) -> crate::mux::MuxStatus {
        self.mux().classify_status(project_id, tmux_name)
    }

    /// Generates `"Session N"` where `N = 1 + max(existing numeric
    /// suffixes)` among sessions named `/^Session (\d+)$/`.
    fn next_generated_name(&self) -> CoreResult<String> {
        let sessions = self.store.list_sessions(None)?;
        let max = sessions
            .iter()
            .filter_map(|s| s.name.strip_prefix("Session "))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("Session {}", max + 1))
    }

    pub fn create(&self, spec: CreateSessionSpec) -> CoreResult<Session> {
        let project_id = spec
            .project_id
            .clone()
            .unwrap_or_else(|| conduit_store::UNCATEGORIZED_PROJECT_ID.to_string());

        if let Some(parent_id) = &spec.parent_session_id {
            return self.fork_with_spec(parent_id, spec);
        }

        let name = match spec.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => match &spec.feature_name {
                Some(feature) if !feature.trim().is_empty() => feature.clone(),
                _ => self.next_generated_name()?,
            },
        };

        let agent_type = spec.agent_type.clone().unwrap_or_else(|| "claude".to_string());
        conduit_config::VALID_AGENT_TYPES
            .contains(&agent_type.as_str())
            .then_some(())
            .ok_or_else(|| CoreError::BadRequest(format!("invalid agent type '{agent_type}'")))?;

        let working_directory = spec
            .working_directory
            .clone()
            .unwrap_or_else(|| "~".to_string());
        let model = spec.model.clone().unwrap_or_else(|| "sonnet".to_string());

        let id = self.store.new_session_id();
        let tmux_name = spec.use_mux.then(|| format!("{agent_type}-{id}"));

        let worktree = if spec.use_worktree {
            Some(self.allocate_worktree(&project_id, &working_directory, &spec)?)
        } else {
            None
        };

        let session = self
            .store
            .create_session(
                &id,
                NewSession {
                    name: &name,
                    working_directory: worktree
                        .as_ref()
                        .map(|w| w.worktree_path.as_str())
                        .unwrap_or(&working_directory),
                    agent_type: &agent_type,
                    model: &model,
                    system_prompt: spec.system_prompt.as_deref(),
                    tmux_name: tmux_name.as_deref(),
                    project_id: &project_id,
                    parent_session_id: None,
                    auto_approve: spec.auto_approve,
                    worktree,
                    conductor_session_id: spec.conductor_session_id.as_deref(),
                    worker_task: spec.worker_task.as_deref(),
                    worker_status: spec
                        .conductor_session_id
                        .is_some()
                        .then_some(conduit_store::WorkerStatus::Pending),
                },
            )
            .map_err(CoreError::from)?;

        if let Some(claude_session_id) = &spec.claude_session_id {
            return Ok(self
                .store
                .set_claude_session_id_if_unset(&session.id, claude_session_id)?);
        }

        if let Some(tmux_name) = &session.tmux_name {
            let cwd = PathBuf::from(&session.working_directory);
            if let Err(e) = self.mux().create(Some(&project_id), tmux_name, &cwd, None) {
                warn!(event = "core.session.mux_create_failed", session = %session.id, error = %e);
            }
        }

        info!(event = "core.session.created", session = %session.id, project = %project_id);
        Ok(session)
    }

    /// Resolves the worktree for a `use_worktree` session: validates the
    /// source is a repo, generates a collision-free branch + directory,
    /// materializes the checkout, runs bootstrap, and allocates a port.
    /// Worktree failures abort the create entirely and surface
    /// `BadRequest` with the upstream stderr attached.
    fn allocate_worktree(
        &self,
        project_id: &str,
        working_directory: &str,
        spec: &CreateSessionSpec,
    ) -> CoreResult<WorktreeBinding> {
        let project = self.store.get_project(project_id)?;
        let feature_name = spec
            .feature_name
            .clone()
            .unwrap_or_else(|| format!("session-{}", self.store.new_session_id()));
        let base_branch = spec
            .base_branch
            .clone()
            .unwrap_or_else(|| self.config.git.default_base_branch.clone());

        let repo_path = Path::new(working_directory);
        let worktrees_root = self.paths.worktrees_dir();
        let project_slug = conduit_git::sanitize_for_path(&project.name.to_lowercase());

        let info = conduit_git::create_worktree(
            repo_path,
            &worktrees_root,
            &project_slug,
            &feature_name,
            &base_branch,
        )
        .map_err(|e| CoreError::BadRequest(e.to_string()))?;

        let include = self.config.include_patterns.clone();
        let runner = CommandStepRunner::new(self.command_runner, Some(project_id));
        let summary = conduit_git::run_bootstrap(
            repo_path,
            &info.worktree_path,
            include.as_ref(),
            &self.config.git.bootstrap_steps,
            Duration::from_secs(self.config.git.bootstrap_timeout_secs),
            &runner,
        );
        if !summary.success {
            warn!(
                event = "core.session.bootstrap_incomplete",
                project = project_id,
                steps = summary.steps.len()
            );
        }

        let port = allocate_port(
            self.store,
            self.config.daemon.port_range_start,
            self.config.daemon.port_range_end,
        )?;

        Ok(WorktreeBinding {
            worktree_path: info.worktree_path.to_string_lossy().to_string(),
            branch_name: info.branch_name,
            base_branch: info.base_branch,
            dev_server_port: Some(port as i64),
        })
    }

    /// `fork(id)` is shorthand for `create` with `parent_session_id = id`;
    /// this is the internal continuation once `create` has detected one.
    fn fork_with_spec(&self, parent_id: &str, spec: CreateSessionSpec) -> CoreResult<Session> {
        let parent = self.store.get_session(parent_id)?;
        let new_id = self.store.new_session_id();
        let tmux_name = spec
            .use_mux
            .then(|| format!("{}-{}", parent.agent_type, new_id));

        let session = self
            .store
            .fork_session(parent_id, &new_id, tmux_name.as_deref())
            .map_err(CoreError::from)?;

        if let Some(tmux_name) = &session.tmux_name {
            let cwd = PathBuf::from(&session.working_directory);
            if let Err(e) = self.mux().create(Some(&session.project_id), tmux_name, &cwd, None) {
                warn!(event = "core.session.fork_mux_create_failed", session = %session.id, error = %e);
            }
        }
        Ok(session)
    }

    pub fn fork(&self, id: &str) -> CoreResult<Session> {
        let mut spec = CreateSessionSpec::new();
        spec.parent_session_id = Some(id.to_string());
        self.create(spec)
    }

    /// Updates `name` and `tmux_name`, renaming the mux pane atomically;
    /// rolls back the Store rename if the pane rename conflicts.
    pub fn rename(&self, id: &str, new_name: &str) -> CoreResult<Session> {
        let session = self.store.get_session(id)?;
        if session.name == new_name {
            return Ok(session);
        }

        if let Some(old_tmux_name) = &session.tmux_name {
            let new_tmux_name = format!("{}-{}", session.agent_type, session.id);
            // tmux_name is derived from the id, not the display name, so a
            // rename never collides at the mux layer under normal operation;
            // still route renames through the driver so a pane that was
            // hand-renamed out of band surfaces a real conflict.
            if old_tmux_name != &new_tmux_name {
                self.mux()
                    .rename(Some(&session.project_id), old_tmux_name, &new_tmux_name)?;
            }
        }

        self.store.rename_session(id, new_name).map_err(CoreError::from)
    }

    /// Reassigns project; no filesystem action.
    pub fn move_to_project(&self, id: &str, project_id: &str) -> CoreResult<Session> {
        self.store.get_project(project_id)?;
        self.store.get_session(id)?;
        self.store
            .reassign_session_project(id, project_id)
            .map_err(CoreError::from)
    }

    /// Kills the mux pane (best effort), deletes the worktree if any
    /// (optionally deleting the branch), releases the port, then removes
    /// the row.
    pub fn delete(&self, id: &str, delete_branch: bool) -> CoreResult<()> {
        let session = self.store.get_session(id)?;

        if let Some(tmux_name) = &session.tmux_name {
            self.mux().kill(Some(&session.project_id), tmux_name).ok();
        }

        if let Some(worktree) = &session.worktree {
            let repo_path = PathBuf::from(&session.working_directory);
            if let Err(e) = conduit_git::delete_worktree(
                &repo_path,
                Path::new(&worktree.worktree_path),
                &worktree.branch_name,
                delete_branch,
            ) {
                warn!(event = "core.session.worktree_delete_failed", session = %id, error = %e);
            }
        }

        self.store.delete_session(id).map_err(CoreError::from)
    }

    /// Invokes the PR tool in the session's worktree and persists the
    /// resulting `{pr_url, pr_number, pr_status}`.
    pub fn pr_upsert(&self, id: &str) -> CoreResult<Session> {
        let session = self.store.get_session(id)?;
        let worktree = session.worktree.as_ref().ok_or_else(|| {
            CoreError::BadRequest("session has no worktree to open a PR from".to_string())
        })?;

        let backend = conduit_forge::detect_backend()
            .ok_or_else(|| CoreError::BadRequest("no PR tool (e.g. gh) found on PATH".to_string()))?;

        let record = backend.create_or_update_pr(
            Path::new(&worktree.worktree_path),
            &worktree.branch_name,
            &worktree.base_branch,
            &session.name,
        )?;

        let status = match record.status {
            conduit_forge::PrStatus::Open => StorePrStatus::Open,
            conduit_forge::PrStatus::Merged => StorePrStatus::Merged,
            conduit_forge::PrStatus::Closed => StorePrStatus::Closed,
        };

        self.store
            .set_pr_info(id, &record.url, record.number, status)
            .map_err(CoreError::from)
    }

    /// Recomputes `status` from the mux driver's classification, so the
    /// poller can observe `running`/`waiting`/`idle`/`error` without the
    /// driver itself holding any state.
    pub fn refresh_status(&self, id: &str) -> CoreResult<Session> {
        let session = self.store.get_session(id)?;
        let Some(tmux_name) = &session.tmux_name else {
            return Ok(session);
        };
        let status = match self.mux().classify_status(Some(&session.project_id), tmux_name) {
            crate::mux::MuxStatus::Idle => SessionStatus::Idle,
            crate::mux::MuxStatus::Running => SessionStatus::Running,
            crate::mux::MuxStatus::Waiting => SessionStatus::Waiting,
            crate::mux::MuxStatus::Error => SessionStatus::Error,
            crate::mux::MuxStatus::Dead => return Ok(session),
        };
        self.store.set_session_status(id, status).map_err(CoreError::from)
    }
}
