//! CLI command definitions

use crate::server::DEFAULT_PORT;
use crate::simulator::{SPECTROMETER_PORT, VALVE_PORT};
use clap::Args;
use std::net::IpAddr;
use std::path::PathBuf;

/// Execute one run
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the push event JSON payload
    #[arg(short, long)]
    pub payload: PathBuf,

    #[command(flatten)]
    pub runner: RunnerArgs,
}

/// Receive push webhooks and trigger runs
#[derive(Debug, Args, Clone)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[command(flatten)]
    pub runner: RunnerArgs,
}

/// How runs are prepared and recorded
#[derive(Debug, Args, Clone)]
pub struct RunnerArgs {
    /// Directory holding one working copy per repository
    #[arg(short, long, default_value = "workspace")]
    pub workspace: PathBuf,

    /// Use this directory as the working copy instead of cloning
    #[arg(long, conflicts_with = "workspace")]
    pub working_copy: Option<PathBuf>,

    /// Results database (defaults to the user data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Don't record the outcome in the results database
    #[arg(long, conflicts_with = "db")]
    pub no_history: bool,

    /// Branch patterns that trigger a run
    #[arg(short, long, default_values_t = default_branches())]
    pub branch: Vec<String>,

    /// Skip environment provisioning
    #[arg(long)]
    pub skip_provision: bool,

    /// conda executable used for provisioning
    #[arg(long, default_value = "conda")]
    pub conda: String,
}

/// Serve the instrument simulators
#[derive(Debug, Args, Clone)]
pub struct SimulateCommand {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: std::net::Ipv4Addr,

    #[arg(long, default_value_t = VALVE_PORT)]
    pub valve_port: u16,

    #[arg(long, default_value_t = SPECTROMETER_PORT)]
    pub spectrometer_port: u16,
}

/// List recorded run outcomes
#[derive(Debug, Args, Clone)]
pub struct ResultsCommand {
    /// Results database (defaults to the user data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Number of recent outcomes to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a run descriptor
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the descriptor YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Branches that trigger runs unless overridden
pub fn default_branches() -> Vec<String> {
    ["develop", "release-*", "feature/*"]
        .into_iter()
        .map(String::from)
        .collect()
}
