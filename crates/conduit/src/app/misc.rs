use clap::{Arg, ArgAction, Command};

pub fn cleanup_command() -> Command {
    Command::new("cleanup")
        .about("Remove orphaned worktrees and pid files left behind by crashed sessions")
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("List what would be removed without removing it"),
        )
}

pub fn completions_command() -> Command {
    Command::new("completions")
        .about("Generate shell completion scripts")
        .arg(
            Arg::new("shell")
                .index(1)
                .required(true)
                .value_parser(["bash", "zsh", "fish"]),
        )
}
