use std::error::Error;

use clap::ArgMatches;
use conduit_core::SessionManager;
use tracing::{error, info};

use crate::color;
use crate::commands::helpers::{build_harness, resolve_session};

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    info!(event = "cli.fork_started", session = %id);

    let harness = build_harness()?;
    let source = resolve_session(&harness.store, id)?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);

    let forked = sessions.fork(&source.id).and_then(|session| {
        match matches.get_one::<String>("name") {
            Some(name) => sessions.rename(&session.id, name),
            None => Ok(session),
        }
    });

    match forked {
        Ok(session) => {
            info!(event = "cli.fork_completed", session_id = %session.id);
            println!("{}", color::aurora("Session forked."));
            println!("  {} {}", color::muted("Name:"), color::ice(&session.name));
            println!("  {} {}", color::muted("Id:"), session.id);
            Ok(())
        }
        Err(e) => {
            error!(event = "cli.fork_failed", error = %e);
            eprintln!("{}", color::error(&format!("Failed to fork session: {}", e)));
            Err(e.into())
        }
    }
}
