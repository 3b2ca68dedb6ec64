mod daemon;
mod devserver;
mod git;
mod global;
mod misc;
mod project;
mod session;
mod worker;

use clap::Command;

/// Assemble the full `conduit` command tree.
pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(session::create_command())
        .subcommand(session::list_command())
        .subcommand(session::status_command())
        .subcommand(session::fork_command())
        .subcommand(session::destroy_command())
        .subcommand(session::attach_command())
        .subcommand(session::cd_command())
        .subcommand(project::project_command())
        .subcommand(worker::worker_command())
        .subcommand(devserver::devserver_command())
        .subcommand(daemon::daemon_command())
        .subcommand(git::diff_command())
        .subcommand(git::commits_command())
        .subcommand(git::sync_command())
        .subcommand(git::stage_command())
        .subcommand(git::unstage_command())
        .subcommand(git::discard_command())
        .subcommand(misc::cleanup_command())
        .subcommand(misc::completions_command())
}
