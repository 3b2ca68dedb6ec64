use clap::{Arg, ArgAction, Command};

pub fn diff_command() -> Command {
    Command::new("diff")
        .about("Show a session's uncommitted worktree diff against its base branch")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(Arg::new("staged").long("staged").action(ArgAction::SetTrue).help("Show only staged changes"))
        .arg(Arg::new("stat").long("stat").action(ArgAction::SetTrue).help("Show a summary instead of a full diff"))
}

pub fn commits_command() -> Command {
    Command::new("commits")
        .about("List commits on a session's branch that are ahead of its base")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_parser(clap::value_parser!(usize))
                .default_value("10"),
        )
}

pub fn sync_command() -> Command {
    Command::new("sync")
        .about("Fetch and rebase a session's branch onto its base branch")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(Arg::new("base").short('b').long("base").help("Override the base branch to rebase onto"))
}

pub fn stage_command() -> Command {
    Command::new("stage")
        .about("Stage a file in a session's worktree")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(Arg::new("path").index(2).required(true).help("Path to stage, relative to the worktree root"))
}

pub fn unstage_command() -> Command {
    Command::new("unstage")
        .about("Unstage a file in a session's worktree, restoring its prior staged-bit")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(Arg::new("path").index(2).required(true).help("Path to unstage, relative to the worktree root"))
}

pub fn discard_command() -> Command {
    Command::new("discard")
        .about("Discard uncommitted changes to a file in a session's worktree")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(Arg::new("path").index(2).required(true).help("Path to discard, relative to the worktree root"))
}
