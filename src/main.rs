use std::process::ExitCode;

use clap::Parser;
use realtime_relay::{
    config::{CliArgs, RelayConfig},
    logging::{init_logging, LoggingConfig},
    server,
};
use tracing::error;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Validate before any listener exists so a bad config never opens the port.
    let config = match RelayConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&LoggingConfig::new(&config.log_level, config.log_json));

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let chain = format!("{e:#}");
            error!(error = %chain, "Server terminated with error");
            ExitCode::FAILURE
        }
    }
}
