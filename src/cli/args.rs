//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Flags override the matching configuration file values.

use clap::Parser;
use std::path::PathBuf;

/// gitbridge - HTTP endpoints over a local Git repository
#[derive(Parser, Debug)]
#[command(name = "gitbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file to load instead of the standard locations
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Repository to configure the session with at startup
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
