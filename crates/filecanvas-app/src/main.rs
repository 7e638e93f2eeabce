//! Main application entry point (native).

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting FileCanvas");

    let cli = filecanvas_app::Cli::parse();
    match filecanvas_app::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
