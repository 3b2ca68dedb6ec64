//! Dispatch table from the parsed [`clap::ArgMatches`] tree to command
//! handlers. Each top-level subcommand gets its own module; command
//! groups (`project`, `worker`, `devserver`, `daemon`) dispatch again
//! internally on their own subcommand.

pub mod helpers;

mod attach;
mod cd;
mod cleanup;
mod completions;
mod create;
mod daemon;
mod destroy;
mod devserver;
mod fork;
mod git;
mod list;
mod project;
mod status;
mod worker;

use std::error::Error;

use clap::ArgMatches;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    match matches.subcommand() {
        Some(("create", sub)) => create::handle(sub),
        Some(("list", sub)) => list::handle(sub),
        Some(("status", sub)) => status::handle(sub),
        Some(("fork", sub)) => fork::handle(sub),
        Some(("destroy", sub)) => destroy::handle(sub),
        Some(("attach", sub)) => attach::handle(sub),
        Some(("cd", sub)) => cd::handle(sub),
        Some(("project", sub)) => project::handle(sub),
        Some(("worker", sub)) => worker::handle(sub),
        Some(("devserver", sub)) => devserver::handle(sub),
        Some(("daemon", sub)) => daemon::handle(sub),
        Some(("diff", sub)) => git::diff(sub),
        Some(("commits", sub)) => git::commits(sub),
        Some(("sync", sub)) => git::sync(sub),
        Some(("stage", sub)) => git::stage(sub),
        Some(("unstage", sub)) => git::unstage(sub),
        Some(("discard", sub)) => git::discard(sub),
        Some(("cleanup", sub)) => cleanup::handle(sub),
        Some(("completions", sub)) => completions::handle(sub),
        _ => unreachable!("clap enforces a subcommand at the root"),
    }
}
