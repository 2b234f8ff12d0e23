use std::process::ExitCode;

use gitdigger::Config;
use gitdigger_server::{logging, startup};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_tracing(config.log_format) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_format = %config.log_format,
        "Starting GitDigger"
    );

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "GitDigger stopped with an error");
            ExitCode::FAILURE
        }
    }
}
