//! CLI module for the team registration auth service

pub mod serve;

use clap::{Parser, Subcommand};

/// Team registration auth - password and OTP login with bearer sessions
#[derive(Parser)]
#[command(name = "teamreg-auth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,
}
