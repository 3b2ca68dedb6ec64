use std::error::Error;

use clap::ArgMatches;
use conduit_core::{SessionManager, SpawnWorkerSpec, WorkerOrchestrator};

use crate::color;
use crate::commands::helpers::{build_harness, resolve_session};

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    match matches.subcommand() {
        Some(("spawn", sub)) => spawn(sub),
        Some(("list", sub)) => list(sub),
        Some(("output", sub)) => output(sub),
        Some(("send", sub)) => send(sub),
        Some(("complete", sub)) => complete(sub),
        Some(("fail", sub)) => fail(sub),
        Some(("kill", sub)) => kill(sub),
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn spawn(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let conductor_arg = matches.get_one::<String>("conductor").expect("required");
    let task = matches.get_one::<String>("task").expect("required");

    let harness = build_harness()?;
    let conductor = resolve_session(&harness.store, conductor_arg)?;

    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);

    let mut spec = SpawnWorkerSpec::new(conductor.id.clone(), task.clone(), conductor.working_directory.clone());
    spec.branch_name = matches.get_one::<String>("branch").cloned();
    if let Some(agent) = matches.get_one::<String>("agent") {
        spec.agent_type = agent.clone();
    }
    if let Some(model) = matches.get_one::<String>("model") {
        spec.model = model.clone();
    }
    spec.use_worktree = !matches.get_flag("no-worktree");

    let worker = orchestrator.spawn_worker(spec)?;
    println!("{}", color::aurora("Worker spawned."));
    println!("  {} {}", color::muted("Name:"), color::ice(&worker.name));
    println!("  {} {}", color::muted("Id:"), worker.id);
    Ok(())
}

fn list(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let conductor_arg = matches.get_one::<String>("conductor").expect("required");
    let harness = build_harness()?;
    let conductor = resolve_session(&harness.store, conductor_arg)?;

    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);
    let workers = orchestrator.list_workers(&conductor.id)?;

    if matches.get_flag("json") {
        let json: Vec<_> = workers
            .iter()
            .map(|w| {
                serde_json::json!({
                    "id": w.id,
                    "name": w.name,
                    "status": w.status.map(|s| s.as_str()),
                    "task": w.task,
                    "branch_name": w.branch_name,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if workers.is_empty() {
        println!("{}", color::muted("No workers."));
        return Ok(());
    }
    for w in workers {
        let status = w.status.map(|s| s.as_str().to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}",
            color::ice(&w.name),
            color::worker_status(&status),
            w.task.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn output(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id_arg = matches.get_one::<String>("id").expect("required");
    let lines = *matches.get_one::<usize>("lines").expect("has default");

    let harness = build_harness()?;
    let worker = resolve_session(&harness.store, id_arg)?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);

    for line in orchestrator.get_worker_output(&worker.id, lines)? {
        println!("{}", line);
    }
    Ok(())
}

fn send(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id_arg = matches.get_one::<String>("id").expect("required");
    let message = matches.get_one::<String>("message").expect("required");

    let harness = build_harness()?;
    let worker = resolve_session(&harness.store, id_arg)?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);

    orchestrator.send_to_worker(&worker.id, message)?;
    println!("{}", color::aurora("Sent."));
    Ok(())
}

fn complete(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id_arg = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let worker = resolve_session(&harness.store, id_arg)?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);

    orchestrator.complete_worker(&worker.id)?;
    println!("{}", color::aurora("Worker marked completed."));
    Ok(())
}

fn fail(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id_arg = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let worker = resolve_session(&harness.store, id_arg)?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);

    orchestrator.fail_worker(&worker.id)?;
    println!("{}", color::ember("Worker marked failed."));
    Ok(())
}

fn kill(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let id_arg = matches.get_one::<String>("id").expect("required");
    let harness = build_harness()?;
    let worker = resolve_session(&harness.store, id_arg)?;
    let sessions = SessionManager::new(&harness.store, &harness.config, &harness.paths, &harness.runner);
    let orchestrator = WorkerOrchestrator::new(&harness.store, &sessions);

    orchestrator.kill_worker(&worker.id, !matches.get_flag("keep-worktree"))?;
    println!("{}", color::aurora("Worker destroyed."));
    Ok(())
}
