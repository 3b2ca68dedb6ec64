use std::error::Error;
use std::io::Write;

use clap::ArgMatches;
use conduit_core::SessionManager;
use tracing::{error, info};

use crate::color;
use crate::commands::helpers::{build_harness, resolve_session};

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    info!(event = "cli.destroy_started", session = %id);

    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;

    if !matches.get_flag("force") && !confirm(&session.name)? {
        println!("{}", color::muted("Aborted."));
        return Ok(());
    }

    let delete_branch = !matches.get_flag("keep-branch");
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);

    match sessions.delete(&session.id, delete_branch) {
        Ok(()) => {
            info!(event = "cli.destroy_completed", session_id = %session.id);
            println!("{}", color::aurora("Session destroyed."));
            Ok(())
        }
        Err(e) => {
            error!(event = "cli.destroy_failed", error = %e);
            eprintln!("{}", color::error(&format!("Failed to destroy session: {}", e)));
            Err(e.into())
        }
    }
}

fn confirm(name: &str) -> Result<bool, Box<dyn Error>> {
    print!("Destroy session '{}'? This removes its worktree. [y/N] ", name);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
