//! The sequential classification loop: ignore rules, own-account transfer
//! suppression, twin-transaction buffering, and entry emission, strictly in
//! input order.

use std::io::Write;

use anyhow::Result;
use indexmap::IndexSet;
use tracing::warn;

use crate::buffer::TransactionBuffer;
use crate::config::{Bank, Config};
use crate::render::{self, RenderContext};
use crate::transaction::Transaction;

/// Per-run diagnostics the CLI surfaces on a separate channel from the
/// journal text.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Names of placeholder payees, in first-seen order, without
    /// duplicates.
    pub unknown_payees: IndexSet<String>,
}

/// Runs every transaction through classification and writes the resulting
/// ledger entries to `out` in input order. Returns the diagnostics
/// collected along the way.
pub fn process<W: Write>(
    transactions: Vec<Transaction>,
    config: &Config,
    bank: &Bank,
    out: &mut W,
) -> Result<Diagnostics> {
    let ctx = RenderContext { config, bank };
    let mut buffer = TransactionBuffer::default();
    let mut diagnostics = Diagnostics::default();

    for t in transactions {
        if t.is_ignored(bank, config) {
            continue;
        }

        {
            let resolved = t.resolve_payee(config);
            if !resolved.found {
                diagnostics.unknown_payees.insert(resolved.payee.name.clone());
            }
        }

        if buffer.is_empty() {
            if let Some(rule) = t.twin_anchor(bank, config) {
                buffer = TransactionBuffer::open(t, rule);
                continue;
            }
        } else if buffer.matches(&t, config) {
            buffer.push(t);
            continue;
        }

        // From here on the transaction will not join the open buffer.
        // Transfers between the user's own accounts keep only the outgoing
        // leg; the suppressed incoming leg must not disturb the buffer.
        if t.own_account_transfer(config).is_some() && !t.amount_real.is_sign_negative() {
            continue;
        }

        if !buffer.is_empty() {
            flush(&mut buffer, &ctx, out)?;
            if let Some(rule) = t.twin_anchor(bank, config) {
                buffer = TransactionBuffer::open(t, rule);
                continue;
            }
        }

        let entry = render::format_entry(&t, None, &ctx)?;
        writeln!(out, "{}", entry)?;
    }

    if !buffer.is_empty() {
        flush(&mut buffer, &ctx, out)?;
    }

    Ok(diagnostics)
}

fn flush<W: Write>(buffer: &mut TransactionBuffer, ctx: &RenderContext, out: &mut W) -> Result<()> {
    if buffer.len() == 1 {
        warn!("an anchor transaction never found its twin; flushing it as a single entry");
    }
    let full = std::mem::take(buffer);
    writeln!(out, "{}", full.flush(ctx)?)?;
    Ok(())
}
