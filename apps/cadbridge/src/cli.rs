use bridge_core::config::BackendMode;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cadbridge",
    about = "Run whitelisted drawing commands in a CAD host or headless",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory override
    #[arg(long, global = true, env = "CADBRIDGE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Backend: auto, live or headless (overrides config and environment)
    #[arg(long, global = true)]
    pub backend: Option<BackendMode>,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute one command and print the JSON result
    Exec {
        /// Command name, e.g. create-line
        command: String,

        /// Parameter as KEY=VALUE (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Parameters as a JSON object, applied before --param
        #[arg(long, value_name = "JSON")]
        params_json: Option<String>,

        /// Per-call timeout for the live host, e.g. 5s or 1500ms
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Attach a drawing summary after a successful command
        #[arg(long)]
        capture: bool,
    },

    /// List the whitelisted commands
    Commands,

    /// Serve requests as a simulated host on the shared directory
    Host {
        /// Console input file to read keystrokes from; without it every
        /// pending request is served on each poll
        #[arg(long)]
        input: Option<PathBuf>,

        /// How often to check for console input or requests
        #[arg(long, default_value = "100ms", value_parser = humantime::parse_duration)]
        poll_interval: Duration,

        /// Name of the drawing the host starts with
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete stale artifacts from the shared directory
    Sweep,

    /// Print the effective configuration
    Config {
        /// Also write it to the config directory
        #[arg(long)]
        save: bool,
    },
}
