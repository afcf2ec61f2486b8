//! CSV input glue: decoding, dialect handling, header detection, bank
//! selection, and column resolution. Everything here runs before the
//! classification engine sees its first transaction.

use std::path::Path;

use anyhow::{bail, Context, Result};
use encoding_rs_io::DecodeReaderBytesBuilder;
use regex::Regex;
use tracing::info;

use crate::config::{Bank, ColumnIndices, Config};
use crate::transaction::Transaction;

/// Reads all records of a CSV file, decoding from the given encoding label
/// (UTF-8 with BOM handling when absent). Files are parsed with a comma
/// delimiter first; exports using semicolons are retried transparently.
pub fn read_records(path: &Path, encoding: Option<&str>) -> Result<Vec<csv::StringRecord>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {:?}", path))?;

    match parse_records(&bytes, b',', encoding) {
        Ok(records) => {
            // A semicolon-delimited file parses "successfully" as one
            // column per row; catch that and retry.
            let single_column_with_semicolons = records
                .first()
                .map(|r| r.len() == 1 && r.get(0).unwrap_or("").contains(';'))
                .unwrap_or(false);
            if single_column_with_semicolons {
                parse_records(&bytes, b';', encoding)
            } else {
                Ok(records)
            }
        }
        Err(_) => parse_records(&bytes, b';', encoding)
            .with_context(|| format!("parsing {:?} with either , or ; delimiters", path)),
    }
}

fn parse_records(
    bytes: &[u8],
    delimiter: u8,
    encoding: Option<&str>,
) -> Result<Vec<csv::StringRecord>> {
    let encoding = match encoding {
        Some(label) => Some(
            encoding_rs::Encoding::for_label(label.as_bytes())
                .with_context(|| format!("unknown encoding label {:?}", label))?,
        ),
        None => None,
    };
    let decoder = DecodeReaderBytesBuilder::new().encoding(encoding).build(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(decoder);
    reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// Whether the first record is a header row: forced by a CLI flag when
/// given, otherwise guessed. A first row with no empty cell is assumed to
/// be a header.
pub fn has_header_row(records: &[csv::StringRecord], forced: Option<bool>) -> bool {
    if let Some(forced) = forced {
        return forced;
    }
    let Some(first) = records.first() else {
        return false;
    };
    let is_header = first.iter().all(|cell| !cell.is_empty());
    if is_header {
        info!("first row has no empty column, assuming it is a header");
    }
    is_header
}

/// Selects the bank profile for an input file: the `--bank` flag wins, then
/// a file-name pattern match, then identifying-columns detection against
/// the header row.
pub fn select_bank<'c>(
    config: &'c Config,
    path: &Path,
    bank_flag: Option<&str>,
    records: &[csv::StringRecord],
    has_header: bool,
) -> Result<&'c Bank> {
    if let Some(name) = bank_flag {
        return config
            .banks
            .get(name)
            .with_context(|| format!("bank `{}` not found in the configuration", name));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for bank in config.banks.values() {
        let Some(pattern) = bank.file_name_pattern.as_deref().filter(|p| !p.is_empty()) else {
            continue;
        };
        // Patterns are compile-checked at config load.
        if Regex::new(pattern).map_or(false, |re| re.is_match(&file_name)) {
            info!(bank = %bank.name, pattern = %pattern, "bank determined by file name pattern");
            return Ok(bank);
        }
    }

    if !has_header {
        bail!(
            "the CSV file has no header row and no bank name was given; \
             cannot determine the bank configuration"
        );
    }
    let header = records
        .first()
        .context("cannot detect a bank from an empty CSV file")?;
    for bank in config.banks.values() {
        if bank.identifies(header) {
            info!(bank = %bank.name, "using automatically detected bank");
            return Ok(bank);
        }
    }
    bail!("no configured bank matches the CSV file {:?}", path);
}

/// Column positions for a bank: its explicit indices when configured,
/// otherwise derived from the header row by column name.
pub fn column_indices(
    bank: &Bank,
    records: &[csv::StringRecord],
    has_header: bool,
) -> Result<ColumnIndices> {
    if let Some(indices) = &bank.column_indices {
        return Ok(indices.clone());
    }
    if !has_header {
        bail!(
            "bank `{}` has no column indices configured and the file has no \
             header row to derive them from",
            bank.name
        );
    }
    let header = records
        .first()
        .context("cannot derive column indices from an empty CSV file")?;
    Ok(bank.indices_from_header(header))
}

/// Builds the transaction sequence, skipping the header row when present.
pub fn transactions_from_records(
    records: &[csv::StringRecord],
    columns: &ColumnIndices,
    has_header: bool,
) -> Vec<Transaction> {
    records
        .iter()
        .skip(usize::from(has_header))
        .map(|record| Transaction::from_record(record, columns))
        .collect()
}
