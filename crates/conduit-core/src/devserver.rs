//! Dev-server supervisor (C7).
//!
//! Starts, stops, and restarts project-scoped dev servers. `node`-type
//! servers are spawned directly via the external-command runner's
//! streaming variant; `docker`-type servers are driven through `docker
//! compose`. Ports are descriptive bookkeeping only — the supervisor never
//! binds them itself (C5 does that for session worktree ports).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use conduit_store::{DevServerInstance, DevServerStatus, DevServerType, Store};
use tracing::{info, warn};

use crate::command::{CommandRunner, RunningCommand};
use crate::errors::{CoreError, CoreResult};

const START_GRACE: Duration = Duration::from_secs(2);
const COMPOSE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct StartDevServerSpec<'a> {
    pub project_id: &'a str,
    pub server_type: DevServerType,
    pub name: &'a str,
    pub command: &'a str,
    pub working_directory: &'a str,
    pub ports: Vec<i64>,
}

/// Tracks the live `Child` handles for `node`-type dev servers, keyed by
/// instance id. Not persisted: on daemon restart, node dev servers are
/// considered gone and must be restarted explicitly (the Store row is the
/// source of truth for `status`, this map is just the supervisor's handle
/// to the process it itself spawned).
pub struct DevServerSupervisor<'a> {
    store: &'a Store,
    runner: &'a CommandRunner,
    running: Mutex<HashMap<String, RunningCommand>>,
}

impl<'a> DevServerSupervisor<'a> {
    pub fn new(store: &'a Store, runner: &'a CommandRunner) -> Self {
        Self {
            store,
            runner,
            running: Mutex::new(HashMap::new()),
        }
    }

    pub fn start(&self, spec: StartDevServerSpec<'_>) -> CoreResult<DevServerInstance> {
        let instance = self.store.create_dev_server_instance(
            spec.project_id,
            spec.server_type,
            spec.name,
            spec.command,
            spec.working_directory,
        )?;

        match spec.server_type {
            DevServerType::Node => self.start_node(&instance, spec.ports),
            DevServerType::Docker => self.start_docker(&instance, spec.ports),
        }
    }

    fn start_node(&self, instance: &DevServerInstance, ports: Vec<i64>) -> CoreResult<DevServerInstance> {
        let argv: Vec<&str> = instance.command.split_whitespace().collect();
        if argv.is_empty() {
            return Err(CoreError::BadRequest("dev server command is empty".to_string()));
        }
        let cwd = Path::new(&instance.working_directory);
        let child = self
            .runner
            .spawn_streaming(&argv, cwd, &HashMap::new())
            .map_err(CoreError::from)?;
        let pid = child.pid();

        let started = self.store.start_dev_server_instance(
            &instance.id,
            DevServerStatus::Starting,
            Some(pid as i64),
            None,
            &ports,
        )?;

        self.running
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(instance.id.clone(), child);

        // Give the process a grace window before declaring it running;
        // a process that is still alive after this interval is considered
        // stable (the alternative trigger — a configured port becoming
        // listenable — is left to the caller's own poller, since that
        // requires knowing which of `ports` to probe).
        std::thread::sleep(START_GRACE);
        let still_alive = self
            .running
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get_mut(&instance.id)
            .map(|c| matches!(c.try_wait(), Ok(None)))
            .unwrap_or(false);

        if still_alive {
            info!(event = "core.devserver.started", id = %instance.id);
            Ok(self.store.start_dev_server_instance(
                &instance.id,
                DevServerStatus::Running,
                Some(pid as i64),
                None,
                &started.ports,
            )?)
        } else {
            warn!(event = "core.devserver.start_failed", id = %instance.id);
            Ok(self.store.mark_dev_server_instance_failed(&instance.id)?)
        }
    }

    fn start_docker(&self, instance: &DevServerInstance, ports: Vec<i64>) -> CoreResult<DevServerInstance> {
        let cwd = Path::new(&instance.working_directory);
        match self.runner.run(
            Some(&instance.project_id),
            &["docker", "compose", "up", "-d", &instance.command],
            cwd,
            COMPOSE_TIMEOUT,
        ) {
            Ok(_) => {
                let container_id = self.compose_container_id(instance).ok();
                Ok(self.store.start_dev_server_instance(
                    &instance.id,
                    DevServerStatus::Running,
                    None,
                    container_id.as_deref(),
                    &ports,
                )?)
            }
            Err(e) => {
                warn!(event = "core.devserver.compose_up_failed", id = %instance.id, error = %e);
                Ok(self.store.mark_dev_server_instance_failed(&instance.id)?)
            }
        }
    }

    fn compose_container_id(&self, instance: &DevServerInstance) -> CoreResult<String> {
        let cwd = Path::new(&instance.working_directory);
        let out = self.runner.run(
            Some(&instance.project_id),
            &["docker", "compose", "ps", "-q", &instance.command],
            cwd,
            COMPOSE_TIMEOUT,
        )?;
        Ok(out.stdout.trim().to_string())
    }

    /// SIGTERM then SIGKILL after the runner's configured grace period.
    pub fn stop(&self, id: &str) -> CoreResult<DevServerInstance> {
        let instance = self.store.get_dev_server_instance(id)?;
        match instance.server_type {
            DevServerType::Node => {
                if let Some(mut child) = self.running.lock().unwrap_or_else(|p| p.into_inner()).remove(id) {
                    child.kill();
                }
            }
            DevServerType::Docker => {
                let cwd = Path::new(&instance.working_directory);
                self.runner
                    .run(
                        Some(&instance.project_id),
                        &["docker", "compose", "stop", &instance.command],
                        cwd,
                        COMPOSE_TIMEOUT,
                    )
                    .ok();
            }
        }
        Ok(self.store.stop_dev_server_instance(id)?)
    }

    /// `stop` followed by `start` with preserved config.
    pub fn restart(&self, id: &str) -> CoreResult<DevServerInstance> {
        let before = self.stop(id)?;
        self.start(StartDevServerSpec {
            project_id: &before.project_id,
            server_type: before.server_type,
            name: &before.name,
            command: &before.command,
            working_directory: &before.working_directory,
            ports: before.ports,
        })
    }

    pub fn remove(&self, id: &str) -> CoreResult<()> {
        self.stop(id).ok();
        self.store.delete_dev_server_instance(id).map_err(CoreError::from)
    }

    pub fn list(&self, project_id: &str) -> CoreResult<Vec<DevServerInstance>> {
        self.store.list_dev_server_instances(project_id).map_err(CoreError::from)
    }

    /// For `node`, tails the captured stdout+stderr; for `docker`,
    /// `compose logs --tail=N`.
    pub fn logs(&self, id: &str, tail_lines: usize) -> CoreResult<Vec<String>> {
        let instance = self.store.get_dev_server_instance(id)?;
        match instance.server_type {
            DevServerType::Node => Ok(self
                .running
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .get(id)
                .map(|child| child.tail_logs(tail_lines))
                .unwrap_or_default()),
            DevServerType::Docker => {
                let cwd = Path::new(&instance.working_directory);
                let out = self.runner.run(
                    Some(&instance.project_id),
                    &[
                        "docker",
                        "compose",
                        "logs",
                        "--tail",
                        &tail_lines.to_string(),
                        &instance.command,
                    ],
                    cwd,
                    COMPOSE_TIMEOUT,
                )?;
                Ok(out.stdout.lines().map(str::to_string).collect())
            }
        }
    }
}
