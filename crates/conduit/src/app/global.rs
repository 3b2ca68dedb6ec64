use clap::{Arg, ArgAction, Command};

/// Root command: name, version, global flags shared by every subcommand.
pub fn root_command() -> Command {
    Command::new("conduit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Control plane for multi-agent coding sessions")
        .long_about(
            "conduit manages coding-agent sessions, their git worktrees, tmux panes, \
             dev servers and worker sub-sessions from a single CLI.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable verbose (debug-level) logging"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Disable colored output"),
        )
}
