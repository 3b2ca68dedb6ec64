use clap::{Arg, ArgAction, Command};

pub fn project_command() -> Command {
    Command::new("project")
        .about("Manage projects")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("create")
                .about("Register a project")
                .arg(Arg::new("path").index(1).required(true).help("Path to the project's git repository"))
                .arg(Arg::new("name").short('n').long("name").help("Display name (defaults to the directory name)"))
                .arg(Arg::new("agent").short('a').long("agent").help("Default agent type for sessions in this project")),
        )
        .subcommand(
            Command::new("list")
                .about("List registered projects")
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print as JSON")),
        )
        .subcommand(
            Command::new("remove")
                .about("Unregister a project")
                .arg(Arg::new("id").index(1).required(true).help("Project id")),
        )
}
