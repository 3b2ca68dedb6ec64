use std::error::Error;

use clap::ArgMatches;

use crate::commands::helpers::{build_harness, is_valid_branch_name, resolve_session};

/// Prints only the resolved worktree path — no decoration — so shells can
/// do `cd "$(conduit cd <id>)"`.
pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    if !is_valid_branch_name(id) {
        return Err(format!("invalid session identifier: '{}'", id).into());
    }

    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;

    match &session.worktree {
        Some(worktree) => {
            println!("{}", worktree.worktree_path);
            Ok(())
        }
        None => Err(format!("session '{}' has no worktree", session.name).into()),
    }
}
