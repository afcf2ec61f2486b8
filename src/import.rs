//! The `import` subcommand: reads one bank CSV export, classifies every
//! transaction, and writes the resulting journal entries.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use itertools::Itertools;

use crate::config::Config;
use crate::engine;
use crate::filespec::FileSpec;
use crate::input;

#[derive(Args, Debug)]
pub struct Cmd {
    /// Configuration file describing accounts, payees, and banks.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    /// Bank profile to use instead of auto-detection.
    #[arg(long)]
    bank: Option<String>,
    /// Treat the first CSV row as a header row.
    #[arg(long, conflicts_with = "no_header")]
    has_header: bool,
    /// Treat the first CSV row as transaction data.
    #[arg(long)]
    no_header: bool,
    /// The file to write the journal to (overwrites any existing file).
    /// "-" writes to stdout.
    #[arg(short, long, default_value = "-")]
    output: FileSpec,
    /// The bank CSV export to read.
    input: PathBuf,
}

impl Cmd {
    pub fn run(&self) -> Result<()> {
        let config = Config::load(&self.config)?;

        let mut records = input::read_records(&self.input, None)?;
        let forced_header = if self.has_header {
            Some(true)
        } else if self.no_header {
            Some(false)
        } else {
            None
        };
        let has_header = input::has_header_row(&records, forced_header);
        let bank = input::select_bank(
            &config,
            &self.input,
            self.bank.as_deref(),
            &records,
            has_header,
        )?;
        if bank.encoding.is_some() {
            records = input::read_records(&self.input, bank.encoding.as_deref())?;
        }

        let columns = input::column_indices(bank, &records, has_header)?;
        let transactions = input::transactions_from_records(&records, &columns, has_header);

        let mut out = self.output.writer()?;
        let diagnostics = engine::process(transactions, &config, bank, &mut out)?;

        if !diagnostics.unknown_payees.is_empty() {
            eprintln!(
                "\nUnclassified payees:\n{}",
                diagnostics.unknown_payees.iter().join("\n")
            );
        }

        Ok(())
    }
}
