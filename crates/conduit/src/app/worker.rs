use clap::{Arg, ArgAction, Command};

pub fn worker_command() -> Command {
    Command::new("worker")
        .about("Manage worker sessions spawned by a conductor session")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("spawn")
                .about("Spawn a worker session under a conductor")
                .arg(Arg::new("conductor").index(1).required(true).help("Conductor session id"))
                .arg(Arg::new("task").long("task").required(true).help("Task description handed to the worker"))
                .arg(Arg::new("branch").long("branch").help("Branch name for the worker's worktree"))
                .arg(Arg::new("agent").long("agent").value_parser(["claude", "amp", "opencode"]))
                .arg(Arg::new("model").long("model"))
                .arg(
                    Arg::new("no-worktree")
                        .long("no-worktree")
                        .action(ArgAction::SetTrue)
                        .help("Run the worker directly in the conductor's working directory"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List workers spawned by a conductor")
                .arg(Arg::new("conductor").index(1).required(true).help("Conductor session id"))
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("output")
                .about("Show a worker's tmux pane output")
                .arg(Arg::new("id").index(1).required(true).help("Worker session id"))
                .arg(Arg::new("lines").short('n').long("lines").value_parser(clap::value_parser!(usize)).default_value("50")),
        )
        .subcommand(
            Command::new("send")
                .about("Send a line of input to a worker's pane")
                .arg(Arg::new("id").index(1).required(true).help("Worker session id"))
                .arg(Arg::new("message").index(2).required(true).allow_hyphen_values(true)),
        )
        .subcommand(
            Command::new("complete")
                .about("Mark a worker as completed")
                .arg(Arg::new("id").index(1).required(true).help("Worker session id")),
        )
        .subcommand(
            Command::new("fail")
                .about("Mark a worker as failed")
                .arg(Arg::new("id").index(1).required(true).help("Worker session id")),
        )
        .subcommand(
            Command::new("kill")
                .about("Destroy a worker session")
                .arg(Arg::new("id").index(1).required(true).help("Worker session id"))
                .arg(Arg::new("keep-worktree").long("keep-worktree").action(ArgAction::SetTrue)),
        )
}
