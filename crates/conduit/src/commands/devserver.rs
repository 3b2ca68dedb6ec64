use std::error::Error;

use clap::ArgMatches;
use conduit_core::{DevServerSupervisor, StartDevServerSpec};
use conduit_store::DevServerType;

use crate::color;
use crate::commands::helpers::build_harness;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    match matches.subcommand() {
        Some(("start", sub)) => start(sub),
        Some(("stop", sub)) => stop(sub),
        Some(("restart", sub)) => restart(sub),
        Some(("remove", sub)) => remove(sub),
        Some(("list", sub)) => list(sub),
        Some(("logs", sub)) => logs(sub),
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn start(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let project_id = matches.get_one::<String>("project").expect("required");
    let name = matches.get_one::<String>("name").expect("required");
    let command = matches.get_one::<String>("command").expect("required");
    let server_type_raw = matches.get_one::<String>("type").expect("has default");
    let server_type = DevServerType::parse(server_type_raw)
        .ok_or_else(|| format!("invalid dev server type '{}'", server_type_raw))?;
    let ports: Vec<i64> = matches.get_many::<i64>("port").map(|v| v.copied().collect()).unwrap_or_default();

    let harness = build_harness()?;
    let project = harness.store.get_project(project_id)?;
    let working_directory = matches
        .get_one::<String>("cwd")
        .cloned()
        .unwrap_or_else(|| project.working_directory.clone());

    let supervisor = DevServerSupervisor::new(&harness.store, &harness.runner);
    let instance = supervisor.start(StartDevServerSpec {
        project_id,
        server_type,
        name,
        command,
        working_directory: &working_directory,
        ports,
    })?;

    println!("{}", color::aurora("Dev server started."));
    println!("  {} {}", color::muted("Name:"), color::ice(&instance.name));
    println!("  {} {}", color::muted("Id:"), instance.id);
    println!("  {} {}", color::muted("Status:"), instance.status.as_str());
    Ok(())
}

fn stop(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let supervisor = DevServerSupervisor::new(&harness.store, &harness.runner);
    supervisor.stop(id)?;
    println!("{}", color::aurora("Dev server stopped."));
    Ok(())
}

fn restart(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let supervisor = DevServerSupervisor::new(&harness.store, &harness.runner);
    supervisor.restart(id)?;
    println!("{}", color::aurora("Dev server restarted."));
    Ok(())
}

fn remove(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let supervisor = DevServerSupervisor::new(&harness.store, &harness.runner);
    supervisor.remove(id)?;
    println!("{}", color::aurora("Dev server removed."));
    Ok(())
}

fn list(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let project_id = matches.get_one::<String>("project").expect("required");
    let harness = build_harness()?;
    let supervisor = DevServerSupervisor::new(&harness.store, &harness.runner);
    let instances = supervisor.list(project_id)?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&instances)?);
        return Ok(());
    }

    if instances.is_empty() {
        println!("{}", color::muted("No dev servers for this project."));
        return Ok(());
    }
    for instance in instances {
        println!(
            "{}  {}  {}  ports={:?}",
            color::ice(&instance.name),
            instance.status.as_str(),
            instance.command,
            instance.ports
        );
    }
    Ok(())
}

fn logs(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let lines = *matches.get_one::<usize>("lines").expect("has default");
    let harness = build_harness()?;
    let supervisor = DevServerSupervisor::new(&harness.store, &harness.runner);
    for line in supervisor.logs(id, lines)? {
        println!("{}", line);
    }
    Ok(())
}
