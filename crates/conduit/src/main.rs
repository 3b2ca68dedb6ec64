mod app;
mod color;
mod commands;
mod logging;
mod table;

fn main() {
    let app = app::build_cli();
    let matches = app.get_matches();

    if matches.get_flag("no-color") {
        color::set_no_color();
    }

    let verbose = matches.get_flag("verbose");
    logging::init_logging(!verbose);

    let exit_code = match commands::run_command(&matches) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", color::error(&format!("Error: {}", e)));
            exit_code_for(e.as_ref())
        }
    };
    std::process::exit(exit_code);
}

/// Map an error to the exit-code contract: 0 success, 1 user error, 2
/// internal/upstream error. `conduit_core::CoreError` already carries this
/// classification; anything else (config/IO errors surfaced before a
/// `CoreError` exists) is treated as an internal error.
fn exit_code_for(e: &(dyn std::error::Error + 'static)) -> i32 {
    if let Some(core_err) = e.downcast_ref::<conduit_core::CoreError>() {
        return core_err.exit_code();
    }
    2
}
