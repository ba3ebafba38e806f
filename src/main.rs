use clap::Parser;
use std::process::ExitCode;
use timetable::app::App;
use timetable::cli::{Args, Command};
use timetable::config::Config;
use timetable::logging::setup_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting timetable"
    );

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "Failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => app.serve().await,
        Command::Fetch(fetch_args) => match app.fetch(fetch_args).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "Lecture query failed");
                ExitCode::FAILURE
            }
        },
    }
}
