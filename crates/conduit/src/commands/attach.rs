use std::error::Error;
use std::ffi::CString;
use std::path::Path;

use clap::ArgMatches;
use conduit_core::MuxDriver;
use nix::unistd::execvp;
use tracing::{error, info};

use crate::color;
use crate::commands::helpers::{build_harness, resolve_session};

/// Attaches the current terminal directly to the session's tmux pane.
///
/// This replaces the CLI process with `tmux attach` rather than brokering
/// the PTY through the daemon: a local terminal already has everything tmux
/// needs (raw mode, resize signals, scrollback) and gains nothing from a
/// socket hop. The daemon's PTY gateway exists for clients that don't have
/// a terminal of their own.
pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    info!(event = "cli.attach_started", session = %id);

    let harness = build_harness()?;
    let session = resolve_session(&harness.store, id)?;
    let tmux_name = session.tmux_name.clone().ok_or_else(|| {
        format!("session '{}' has no tmux pane (created with --no-mux?)", session.name)
    })?;

    let mux = MuxDriver::new(&harness.runner);
    let cwd = session
        .worktree
        .as_ref()
        .map(|w| w.worktree_path.clone())
        .unwrap_or_else(|| session.working_directory.clone());

    let argv = match mux.attach_command(Some(session.project_id.as_str()), &tmux_name, Path::new(&cwd)) {
        Ok(argv) => argv,
        Err(e) => {
            error!(event = "cli.attach_failed", error = %e);
            eprintln!("{}", color::error(&format!("Failed to attach: {}", e)));
            return Err(e.into());
        }
    };

    info!(event = "cli.attach_completed", session_id = %session.id, pane = %tmux_name);

    let argv_c: Vec<CString> = argv.iter().map(|s| CString::new(s.as_str()).unwrap()).collect();
    execvp(&argv_c[0], &argv_c).map_err(|e| format!("failed to exec tmux: {}", e))?;
    unreachable!("execvp replaces the current process on success")
}
