use clap::{Arg, ArgAction, Command};

pub fn devserver_command() -> Command {
    Command::new("devserver")
        .about("Manage project dev servers (node or docker-compose)")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("start")
                .about("Start a dev server")
                .arg(Arg::new("project").long("project").required(true))
                .arg(Arg::new("type").long("type").value_parser(["node", "docker"]).default_value("node"))
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("command").long("command").required(true).allow_hyphen_values(true))
                .arg(Arg::new("cwd").long("cwd").help("Working directory (defaults to the project directory)"))
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .action(ArgAction::Append)
                        .value_parser(clap::value_parser!(i64))
                        .help("Port to record for this instance (repeatable)"),
                ),
        )
        .subcommand(
            Command::new("stop")
                .about("Stop a dev server")
                .arg(Arg::new("id").index(1).required(true)),
        )
        .subcommand(
            Command::new("restart")
                .about("Restart a dev server")
                .arg(Arg::new("id").index(1).required(true)),
        )
        .subcommand(
            Command::new("remove")
                .about("Stop and forget a dev server")
                .arg(Arg::new("id").index(1).required(true)),
        )
        .subcommand(
            Command::new("list")
                .about("List dev servers for a project")
                .arg(Arg::new("project").long("project").required(true))
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("logs")
                .about("Show a dev server's recent log output")
                .arg(Arg::new("id").index(1).required(true))
                .arg(Arg::new("lines").short('n').long("lines").value_parser(clap::value_parser!(usize)).default_value("100")),
        )
}
