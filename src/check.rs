//! The `check` subcommand: loads the configuration and reports the lint
//! findings that are not load-fatal, i.e. payees that would fail account
//! resolution when first used.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct Cmd {
    /// Configuration file describing accounts, payees, and banks.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

impl Cmd {
    pub fn run(&self) -> Result<()> {
        let config = Config::load(&self.config)?;

        let unassigned = config.payees_without_account();
        for payee in &unassigned {
            println!("payee `{}` has no assigned account", payee.name);
        }
        if unassigned.is_empty() {
            println!(
                "configuration OK: {} payees, {} banks",
                config.payees.len(),
                config.banks.len()
            );
        }
        Ok(())
    }
}
