//! # condor-git-config hook binary
//!
//! This is the binary entry point for the `condor-git-config` hook.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the update-select-emit pipeline from the library crate.
//! - Translating any failure into diagnostics on stderr and a non-zero
//!   exit code, which the scheduler treats as a fatal configuration load
//!   error for the node. Nothing is ever written to stdout on failure.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
