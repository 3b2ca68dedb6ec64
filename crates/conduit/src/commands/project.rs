use std::error::Error;

use clap::ArgMatches;

use crate::color;
use crate::commands::helpers::build_harness;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    match matches.subcommand() {
        Some(("create", sub)) => create(sub),
        Some(("list", sub)) => list(sub),
        Some(("remove", sub)) => remove(sub),
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn create(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let path = matches.get_one::<String>("path").expect("required");
    let working_directory = std::fs::canonicalize(path)
        .map_err(|e| format!("'{}' is not a valid path: {}", path, e))?;
    let name = matches
        .get_one::<String>("name")
        .cloned()
        .or_else(|| working_directory.file_name().map(|n| n.to_string_lossy().into_owned()))
        .ok_or("could not determine a project name")?;
    let agent_type = matches
        .get_one::<String>("agent")
        .cloned()
        .unwrap_or_else(|| "claude".to_string());

    let harness = build_harness()?;
    let id = harness.store.new_project_id();
    let project = harness.store.create_project(
        &id,
        &name,
        &working_directory.to_string_lossy(),
        &agent_type,
    )?;

    println!("{}", color::aurora("Project created."));
    println!("  {} {}", color::muted("Name:"), color::ice(&project.name));
    println!("  {} {}", color::muted("Id:"), project.id);
    Ok(())
}

fn list(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let harness = build_harness()?;
    let projects = harness.store.list_projects()?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("{}", color::muted("No projects registered."));
        return Ok(());
    }

    for project in projects {
        println!(
            "{}  {}  {}",
            color::ice(&project.name),
            color::muted(&project.id),
            project.working_directory
        );
    }
    Ok(())
}

fn remove(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    harness.store.delete_project(id)?;
    println!("{}", color::aurora("Project removed."));
    Ok(())
}
