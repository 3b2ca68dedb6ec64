//! Removes bookkeeping left behind by crashed sessions: store rows whose
//! worktree directory no longer exists, and worktree directories with no
//! matching row. Neither case can be reached through normal session
//! teardown, since that always removes both sides together.

use std::error::Error;
use std::path::Path;

use clap::ArgMatches;
use conduit_paths::ConduitPaths;

use crate::color;
use crate::commands::helpers::build_harness;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let dry_run = matches.get_flag("dry-run");
    let harness = build_harness()?;
    let paths = ConduitPaths::resolve()?;

    let mut cleaned = 0usize;
    let sessions = harness.store.list_sessions(None)?;

    for session in &sessions {
        let Some(worktree) = &session.worktree else { continue };
        if Path::new(&worktree.worktree_path).exists() {
            continue;
        }
        println!(
            "{}",
            color::warning(&format!("Orphaned session row '{}' (worktree gone): {}", session.name, worktree.worktree_path))
        );
        if !dry_run {
            harness.store.delete_session(&session.id)?;
        }
        cleaned += 1;
    }

    let known_dirs: std::collections::HashSet<String> = sessions
        .iter()
        .filter_map(|s| s.worktree.as_ref())
        .map(|w| w.worktree_path.clone())
        .collect();

    let worktrees_dir = paths.worktrees_dir();
    if worktrees_dir.exists() {
        for entry in std::fs::read_dir(&worktrees_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if known_dirs.contains(&path.to_string_lossy().into_owned()) {
                continue;
            }
            println!("{}", color::warning(&format!("Orphaned worktree directory: {}", path.display())));
            if !dry_run {
                std::fs::remove_dir_all(&path)?;
            }
            cleaned += 1;
        }
    }

    if cleaned == 0 {
        println!("{}", color::muted("Nothing to clean up."));
    } else if dry_run {
        println!("{}", color::aurora(&format!("{} item(s) would be cleaned up.", cleaned)));
    } else {
        println!("{}", color::aurora(&format!("Cleaned up {} item(s).", cleaned)));
    }
    Ok(())
}
