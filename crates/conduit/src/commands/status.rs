use std::error::Error;

use clap::ArgMatches;
use conduit_core::SessionManager;

use crate::color;
use crate::commands::helpers::{build_harness, resolve_session};

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;

    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let session = sessions.refresh_status(&session.id)?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!("{} {}", color::muted("Name:"), color::ice(&session.name));
    println!("{} {}", color::muted("Status:"), color::status(session.status.as_str()));
    println!("{} {}", color::muted("Agent:"), session.agent_type);
    if let Some(worktree) = &session.worktree {
        println!("{} {}", color::muted("Branch:"), color::ice(&worktree.branch_name));
    }
    if let Some(status) = &session.worker_status {
        println!("{} {}", color::muted("Worker status:"), color::worker_status(status.as_str()));
    }
    Ok(())
}
