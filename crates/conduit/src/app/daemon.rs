use clap::{Arg, ArgAction, Command};

pub fn daemon_command() -> Command {
    Command::new("daemon")
        .about("Control the conduit-daemon terminal gateway process")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("start")
                .about("Start the daemon")
                .arg(
                    Arg::new("foreground")
                        .long("foreground")
                        .action(ArgAction::SetTrue)
                        .help("Run in the foreground instead of forking into the background"),
                ),
        )
        .subcommand(Command::new("stop").about("Stop the daemon"))
        .subcommand(
            Command::new("status")
                .about("Show whether the daemon is running")
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
}
