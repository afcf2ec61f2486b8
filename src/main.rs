use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

#[cfg(test)]
mod testutil;

mod buffer;
mod check;
mod config;
mod engine;
mod filespec;
mod import;
mod input;
mod render;
mod template;
mod transaction;

#[derive(Debug, Parser)]
/// Converts bank CSV exports into plaintext-accounting journal entries.
struct Command {
    #[command(subcommand)]
    subcmd: SubCommand,
}

#[derive(Debug, Subcommand)]
enum SubCommand {
    /// Reads a bank CSV export, classifies each transaction against the
    /// configured payee catalogue, and dumps the resulting journal entries
    /// to stdout.
    Import(import::Cmd),
    /// Loads the configuration and reports payees without a resolvable
    /// account.
    Check(check::Cmd),
}

fn main() -> Result<()> {
    fn get_rust_log() -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into())
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = Command::parse();
    use SubCommand::*;
    match cmd.subcmd {
        Import(cmd) => cmd.run(),
        Check(cmd) => cmd.run(),
    }
}
