use std::error::Error;
use std::io;

use clap::ArgMatches;
use clap_complete::{generate, Shell};

use crate::app::build_cli;

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let shell_name = matches.get_one::<String>("shell").expect("required");
    let shell: Shell = shell_name.parse().map_err(|_| format!("unsupported shell '{}'", shell_name))?;

    let mut cmd = build_cli();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
