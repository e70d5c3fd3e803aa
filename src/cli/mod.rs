//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ResultsCommand, RunCommand, ServeCommand, SimulateCommand, ValidateCommand};
use std::ffi::OsString;

/// Hardware-in-the-loop experiment orchestrator
#[derive(Debug, Parser, Clone)]
#[command(name = "psychodrama")]
#[command(version)]
#[command(about = "Runs experiment pipelines against instruments or their simulators", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Execute one run for a push event payload
    Run(RunCommand),

    /// Receive push webhooks and run matching branches in the background
    Serve(ServeCommand),

    /// Serve the instrument simulators until interrupted
    Simulate(SimulateCommand),

    /// List recorded run outcomes
    Results(ResultsCommand),

    /// Validate a run descriptor
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
