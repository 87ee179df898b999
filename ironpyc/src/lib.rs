//! ironpyc CLI library: argument parsing and command dispatch.

mod cli;
mod command_registry;
mod commands;
mod dispatch;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use command_registry::CommandRegistry;

/// Run the CLI: parse args, set up logging and dispatch to the command handler.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    ironpyc_core::observability::init_tracing();

    let mut registry = CommandRegistry::new();
    dispatch::register_all(&mut registry);
    registry.dispatch(&cli.command)
}
