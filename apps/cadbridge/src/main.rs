use cadbridge::app::{
    build_selector, describe_commands, exec, failure_envelope, load_config, resolve_config_dir,
    sweep, with_call_timeout,
};
use cadbridge::cli::{Cli, Commands};
use cadbridge::error::CadbridgeError;
use cadbridge::host::HostLoop;
use cadbridge::logger::{initialize as LoggerInitialize, level_for_verbosity};
use cadbridge::params::build_params;

use bridge_core::commands::CommandTable;
use bridge_core::document::Document;
use bridge_core::storage::IpcDirectory;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use serde_json::Value;

const LOG_DIR_NAME: &str = "logs";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command_name = match &cli.command {
        Commands::Exec { command, .. } => Some(command.clone()),
        _ => None,
    };

    match run(cli).await {
        Ok(output) => {
            print_json(&output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            print_json(&failure_envelope(command_name.as_deref(), &e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value, CadbridgeError> {
    let config_dir = resolve_config_dir(cli.config_dir.as_deref());

    let log_dir = config_dir.join(LOG_DIR_NAME);
    create_dir_all(&log_dir).map_err(|e| CadbridgeError::Cadbridge {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    LoggerInitialize(&log_dir, level_for_verbosity(cli.verbose))?;

    let config = load_config(&config_dir, cli.backend)?;
    let table = Arc::new(CommandTable::builtin(config.host.allow_scripts));

    match cli.command {
        Commands::Exec {
            command,
            params,
            params_json,
            timeout,
            capture,
        } => {
            let params = build_params(&params, params_json.as_deref())?;
            let config = with_call_timeout(config, timeout);
            let selector = build_selector(&config, table)?;

            info!("Executing '{command}' (backend mode {})", config.backend);
            exec(
                &selector,
                &command,
                &params,
                capture && !config.feedback.only_text,
            )
            .await
        }

        Commands::Commands => Ok(describe_commands(&table)),

        Commands::Host {
            input,
            poll_interval,
            name,
        } => {
            let directory = IpcDirectory::new(config.ipc_dir());
            directory
                .ensure_exists()
                .map_err(|e| CadbridgeError::Cadbridge {
                    message: format!(
                        "Failed to create shared directory {}: {e}",
                        directory.root().display()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            if let Err(e) = directory.sweep_stale(config.stale_threshold()) {
                warn!("Stale sweep failed: {e}");
            }

            let input = input.or_else(|| config.host.console_path.clone());
            let document = name.map(Document::new).unwrap_or_default();
            let mut host = HostLoop::new(directory, table, document, input);
            host.skip_existing_input()?;

            info!(
                "Host serving {} every {}",
                host.directory().display(),
                humantime::format_duration(poll_interval)
            );
            loop {
                match host.tick() {
                    Ok(0) => {}
                    Ok(answered) => info!(
                        "Answered {answered} request(s); drawing has {} entities",
                        host.document().entities().len()
                    ),
                    Err(e) => warn!("Host poll failed: {e}"),
                }
                tokio::time::sleep(poll_interval).await;
            }
        }

        Commands::Sweep => sweep(&config),

        Commands::Config { save } => {
            if save {
                config.save(&config_dir)?;
            }
            serde_json::to_value(&config).map_err(|e| CadbridgeError::Cadbridge {
                message: format!("Failed to render config: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("Failed to render output: {e}"),
    }
}
