//! Adapts the external-command runner (C2) to `conduit_git`'s `StepRunner`
//! seam, so the worktree manager's bootstrap steps (§4.4 step 5) run
//! through the same argv discipline as every other external command.

use std::path::Path;
use std::time::Duration;

use conduit_git::{BootstrapStepResult, StepRunner};

use crate::command::CommandRunner;

pub struct CommandStepRunner<'a> {
    runner: &'a CommandRunner,
    project_id: Option<&'a str>,
}

impl<'a> CommandStepRunner<'a> {
    pub fn new(runner: &'a CommandRunner, project_id: Option<&'a str>) -> Self {
        Self { runner, project_id }
    }
}

impl StepRunner for CommandStepRunner<'_> {
    fn run(&self, worktree_dir: &Path, command: &str, timeout: Duration) -> BootstrapStepResult {
        // Bootstrap steps are user-authored shell strings (e.g. `npm install`),
        // the one documented `run_in_shell` exception.
        match self
            .runner
            .run_in_shell(self.project_id, command, worktree_dir, timeout)
        {
            Ok(out) => BootstrapStepResult {
                command: command.to_string(),
                success: true,
                output: format!("{}{}", out.stdout, out.stderr),
            },
            Err(e) => BootstrapStepResult {
                command: command.to_string(),
                success: false,
                output: e.to_string(),
            },
        }
    }
}
