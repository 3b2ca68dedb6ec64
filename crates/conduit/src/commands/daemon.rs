use std::error::Error;
use std::process::Stdio;

use clap::ArgMatches;
use conduit_paths::ConduitPaths;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::color;
use crate::commands::helpers::ping_daemon;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    match matches.subcommand() {
        Some(("start", sub)) => start(sub),
        Some(("stop", sub)) => stop(sub),
        Some(("status", sub)) => status(sub),
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn start(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let paths = ConduitPaths::resolve()?;
    std::fs::create_dir_all(paths.conduit_dir())?;

    if ping_daemon(&paths) {
        println!("{}", color::muted("Daemon already running."));
        return Ok(());
    }

    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or("could not determine conduit's install directory")?;
    let daemon_path = dir.join("conduit-daemon");

    if matches.get_flag("foreground") {
        let status = std::process::Command::new(&daemon_path).status()?;
        if !status.success() {
            return Err(format!("conduit-daemon exited with {}", status).into());
        }
        return Ok(());
    }

    std::process::Command::new(&daemon_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    println!("{}", color::aurora("Daemon starting."));
    Ok(())
}

fn stop(_matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let paths = ConduitPaths::resolve()?;
    let pid_file = paths.daemon_pid_file();
    let Ok(contents) = std::fs::read_to_string(&pid_file) else {
        println!("{}", color::muted("Daemon is not running (no pid file)."));
        return Ok(());
    };
    let pid: i32 = contents
        .trim()
        .parse()
        .map_err(|_| format!("malformed pid file at {}", pid_file.display()))?;

    signal::kill(Pid::from_raw(pid), Signal::SIGTERM)
        .map_err(|e| format!("failed to signal daemon (pid {}): {}", pid, e))?;
    println!("{}", color::aurora("Sent shutdown signal to daemon."));
    Ok(())
}

fn status(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let paths = ConduitPaths::resolve()?;
    let running = ping_daemon(&paths);

    if matches.get_flag("json") {
        println!("{}", serde_json::json!({ "running": running }));
        return Ok(());
    }

    if running {
        println!("{}", color::aurora("Daemon is running."));
    } else {
        println!("{}", color::muted("Daemon is not running."));
    }
    Ok(())
}
