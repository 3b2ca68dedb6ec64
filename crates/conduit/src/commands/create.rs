use std::error::Error;

use clap::ArgMatches;
use conduit_core::{CreateSessionSpec, SessionManager};
use tracing::{error, info};

use crate::color;
use crate::commands::helpers::{build_harness, is_valid_branch_name};

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    info!(event = "cli.create_started");

    if let Some(feature) = matches.get_one::<String>("feature")
        && !is_valid_branch_name(feature)
    {
        let msg = format!("invalid feature name: '{}'", feature);
        error!(event = "cli.create_failed", error = %msg);
        eprintln!("{}", color::error(&msg));
        return Err(msg.into());
    }

    let harness = build_harness()?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);

    let mut spec = CreateSessionSpec::new();
    spec.name = matches.get_one::<String>("name").cloned();
    spec.project_id = matches.get_one::<String>("project").cloned();
    spec.agent_type = matches.get_one::<String>("agent").cloned();
    spec.model = matches.get_one::<String>("model").cloned();
    spec.feature_name = matches.get_one::<String>("feature").cloned();
    spec.base_branch = matches.get_one::<String>("base").cloned();
    spec.parent_session_id = matches.get_one::<String>("parent").cloned();
    spec.initial_prompt = matches.get_one::<String>("initial-prompt").cloned();
    spec.use_worktree = !matches.get_flag("no-worktree");
    spec.use_mux = !matches.get_flag("no-mux");

    match sessions.create(spec) {
        Ok(session) => {
            info!(event = "cli.create_completed", session_id = %session.id);
            if matches.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                println!("{}", color::aurora("Session created."));
                println!("  {} {}", color::muted("Name:"), color::ice(&session.name));
                println!("  {} {}", color::muted("Id:"), session.id);
                if let Some(worktree) = &session.worktree {
                    println!("  {} {}", color::muted("Branch:"), color::ice(&worktree.branch_name));
                    println!("  {} {}", color::muted("Worktree:"), worktree.worktree_path);
                }
                if let Some(tmux_name) = &session.tmux_name {
                    println!("  {} conduit attach {}", color::muted("Attach:"), tmux_name);
                }
            }
            Ok(())
        }
        Err(e) => {
            error!(event = "cli.create_failed", error = %e);
            eprintln!("{}", color::error(&format!("Failed to create session: {}", e)));
            Err(e.into())
        }
    }
}
