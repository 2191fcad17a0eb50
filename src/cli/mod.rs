//! Command line interface

pub mod serve;

use clap::{Parser, Subcommand};

/// LeadFlow - workflow automation for lead management
#[derive(Parser)]
#[command(name = "leadflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve(serve::ServeArgs),
}
