use std::error::Error;

use clap::ArgMatches;

use crate::color;
use crate::commands::helpers::build_harness;
use crate::table::TableFormatter;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let harness = build_harness()?;
    let project = matches.get_one::<String>("project").map(|s| s.as_str());
    let sessions = harness.store.list_sessions(project)?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("{}", color::muted("No active sessions found."));
        return Ok(());
    }

    TableFormatter::new(&sessions).print_table(&sessions);
    Ok(())
}
