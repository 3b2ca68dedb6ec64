use clap::{Arg, ArgAction, Command};

pub fn create_command() -> Command {
    Command::new("create")
        .about("Create a new agent session")
        .arg(Arg::new("name").index(1).help("Session name (auto-generated if omitted)"))
        .arg(Arg::new("project").short('p').long("project").help("Project id to attach the session to"))
        .arg(
            Arg::new("agent")
                .short('a')
                .long("agent")
                .value_parser(["claude", "amp", "opencode"])
                .help("Agent type to launch"),
        )
        .arg(Arg::new("model").short('m').long("model").help("Model identifier passed to the agent"))
        .arg(Arg::new("feature").short('f').long("feature").help("Feature name used to derive the branch name"))
        .arg(Arg::new("base").short('b').long("base").help("Base branch to fork the worktree from"))
        .arg(
            Arg::new("no-worktree")
                .long("no-worktree")
                .action(ArgAction::SetTrue)
                .help("Run the session directly in the project directory instead of a git worktree"),
        )
        .arg(
            Arg::new("no-mux")
                .long("no-mux")
                .action(ArgAction::SetTrue)
                .help("Skip creating a tmux pane for this session"),
        )
        .arg(Arg::new("parent").long("parent").help("Fork this session from an existing one"))
        .arg(Arg::new("initial-prompt").long("initial-prompt").value_name("TEXT").help("Prompt sent to the agent on first attach"))
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print the created session as JSON"))
}

pub fn list_command() -> Command {
    Command::new("list")
        .about("List sessions")
        .arg(Arg::new("project").short('p').long("project").help("Limit to a single project"))
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print as JSON"))
}

pub fn status_command() -> Command {
    Command::new("status")
        .about("Show a session's current status")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print as JSON"))
}

pub fn fork_command() -> Command {
    Command::new("fork")
        .about("Fork a new session from an existing one's worktree")
        .arg(Arg::new("id").index(1).required(true).help("Session id to fork from"))
        .arg(Arg::new("name").long("name").help("Name for the forked session"))
}

pub fn destroy_command() -> Command {
    Command::new("destroy")
        .about("Stop a session, remove its worktree and delete it")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
        .arg(
            Arg::new("keep-branch")
                .long("keep-branch")
                .action(ArgAction::SetTrue)
                .help("Keep the git branch after removing the worktree"),
        )
        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue).help("Skip the confirmation prompt"))
}

pub fn attach_command() -> Command {
    Command::new("attach")
        .about("Attach this terminal to a session's tmux pane")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
}

pub fn cd_command() -> Command {
    Command::new("cd")
        .about("Print a session's worktree path (for use with: cd \"$(conduit cd <id>)\")")
        .arg(Arg::new("id").index(1).required(true).help("Session id or name"))
}
