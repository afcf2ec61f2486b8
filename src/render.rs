//! Renders classified transactions into ledger entry text. All formatting
//! is deterministic: the same transaction and buffer always produce
//! byte-identical output.

use anyhow::{bail, Result};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::config::{Bank, Config, Payee, TwinKind, TwinRule};
use crate::template;
use crate::transaction::Transaction;

/// Everything rendering needs besides the transaction itself.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub config: &'a Config,
    pub bank: &'a Bank,
}

/// The non-primary transactions of a flushed buffer, with the rule that
/// grouped them.
#[derive(Clone, Copy, Debug)]
pub struct TwinGroup<'a> {
    pub rule: &'a TwinRule,
    pub transactions: &'a [Transaction],
}

/// How one amount is displayed: the symbol text and its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub sign: String,
    pub in_front: bool,
}

/// Display rules for a currency symbol, falling back to the account
/// currency when the symbol is empty. Symbols without a map entry keep
/// their raw code, rendered behind the number.
pub fn currency_info(config: &Config, symbol: &str, account_symbol: &str) -> CurrencyInfo {
    let symbol = if symbol.is_empty() { account_symbol } else { symbol };
    let mut info = CurrencyInfo {
        sign: symbol.to_string(),
        in_front: false,
    };
    if let Some(mapped) = config.currencies.symbol_map.get(symbol) {
        if !info.sign.is_empty() {
            info.sign = mapped.to.clone();
        }
        info.in_front = mapped.in_front;
    }
    info
}

/// Two-decimal fixed point with the currency symbol in front (`$12.34`,
/// `-$12.34`) or behind (`-12.34 Kc`).
pub fn format_amount(amount: Decimal, currency: &CurrencyInfo) -> String {
    let amount = amount.round_dp(2);
    if currency.sign.is_empty() {
        format!("{:.2}", amount)
    } else if currency.in_front {
        if amount.is_sign_negative() {
            format!("-{}{:.2}", currency.sign, amount.abs())
        } else {
            format!("{}{:.2}", currency.sign, amount)
        }
    } else {
        format!("{:.2} {}", amount, currency.sign)
    }
}

/// The ` @ rate REF` annotation appended to amounts in any currency other
/// than the configured reference currency.
fn exchange_annotation(t: &Transaction, currency: &CurrencyInfo, config: &Config) -> String {
    let Some(reference) = config.currencies.reference.as_deref() else {
        return String::new();
    };
    if currency.sign == reference || t.amount_real.is_zero() {
        return String::new();
    }
    let rate = (t.amount_account / t.amount_real).round_dp(6);
    format!(" @ {:.6} {}", rate, reference)
}

fn amount_with_annotation(
    t: &Transaction,
    amount: Decimal,
    currency: &CurrencyInfo,
    config: &Config,
) -> String {
    format!(
        "{}{}",
        format_amount(amount, currency),
        exchange_annotation(t, currency, config)
    )
}

/// Formats an amount in the transaction's real currency.
fn format_amount_real(t: &Transaction, amount: Decimal, config: &Config) -> String {
    let currency = currency_info(config, &t.currency_raw, &t.currency_account);
    amount_with_annotation(t, amount, &currency, config)
}

/// The rendered payee text: the payee's display template if it has one,
/// its literal name otherwise.
pub fn payee_text(payee: &Payee, bank: &Bank, t: &Transaction) -> Result<String> {
    match &payee.template {
        Some(tmpl) => template::render(tmpl, &template::context(bank, t, payee)),
        None => Ok(payee.name.clone()),
    }
}

/// The destination account path for a payee: its account template when
/// present, its literal account otherwise; `{alias}` tokens resolve through
/// the bank's template table. A payee with neither is a configuration
/// error.
pub fn account_path(payee: &Payee, bank: &Bank, t: &Transaction) -> Result<String> {
    let raw = match (&payee.account_template, &payee.account) {
        (Some(tmpl), _) => template::render(tmpl, &template::context(bank, t, payee))?,
        (None, Some(account)) => account.clone(),
        (None, None) => bail!(
            "payee `{}` has neither an account nor an account template",
            payee.name
        ),
    };
    Ok(template::resolve_aliases(&raw, &bank.templates))
}

/// Payee-level meta overlaid with the matched pattern's meta, values
/// rendered through the template engine.
fn meta_lines(t: &Transaction, ctx: &RenderContext) -> Result<Vec<String>> {
    let resolved = t.resolve_payee(ctx.config);
    let mut merged: IndexMap<String, String> = IndexMap::new();
    if let Some(meta) = &resolved.payee.meta {
        merged.extend(meta.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(meta) = resolved.pattern.as_ref().and_then(|p| p.meta.as_ref()) {
        for (k, v) in meta {
            merged.insert(k.clone(), v.clone());
        }
    }

    let template_ctx = template::context(ctx.bank, t, &resolved.payee);
    let mut lines = Vec::with_capacity(merged.len());
    for (key, value) in &merged {
        let rendered = if value.contains("{{") {
            template::render(value, &template_ctx)?
        } else {
            value.clone()
        };
        lines.push(format!("    ; {}: {}", key, rendered));
    }
    Ok(lines)
}

/// Assembles one complete ledger entry for a transaction, folding in the
/// buffered twins when a twin group flushes.
pub fn format_entry(t: &Transaction, twins: Option<TwinGroup>, ctx: &RenderContext) -> Result<String> {
    let config = ctx.config;
    let bank = ctx.bank;
    let resolved = t.resolve_payee(config);

    let mut header = format!(
        "{} * {}",
        t.format_date(bank),
        payee_text(&resolved.payee, bank, t)?
    );
    if let Some(note) = &resolved.payee.note {
        header.push(' ');
        header.push_str(note);
    }

    let mut lines = vec![header];
    lines.extend(meta_lines(t, ctx)?);

    // Destination line. In sum mode the buffered twins' amounts fold into
    // this single line.
    let mut dest_amount = -t.amount_real;
    if let Some(group) = twins {
        if group.rule.kind == TwinKind::Sum {
            for twin in group.transactions {
                let mut contribution = -twin.amount_real;
                if group.rule.inverted {
                    contribution = -contribution;
                }
                dest_amount += contribution;
            }
        }
    }
    lines.push(format!(
        "    {}  {}",
        account_path(&resolved.payee, bank, t)?,
        format_amount_real(t, dest_amount, config)
    ));

    // Fee line, in the account currency.
    if !t.fee.is_zero() {
        let fee_account = bank.fee_account_name.as_deref().unwrap_or("Unknown:Fees");
        let currency = currency_info(config, &t.currency_account, &t.currency_account);
        lines.push(format!(
            "    {}  {}",
            fee_account,
            amount_with_annotation(t, -t.fee, &currency, config)
        ));
    }

    // Twin lines: merge mode renders each buffered transaction against its
    // own resolved account with its own amount.
    let mut twin_block_rendered = false;
    if let Some(group) = twins {
        if group.rule.kind == TwinKind::Merge {
            for twin in group.transactions {
                let twin_resolved = twin.resolve_payee(config);
                let mut amount = twin.amount_real;
                if group.rule.inverted {
                    amount = -amount;
                }
                lines.push(format!(
                    "    {}  {}",
                    account_path(&twin_resolved.payee, bank, twin)?,
                    format_amount_real(twin, amount, config)
                ));
                twin_block_rendered = true;
            }
        }
    }

    // Source line. The explicit total appears only when balance cannot be
    // implied: a fee was posted, a twin block was rendered, or the entry
    // mixes currencies.
    let account_from = if bank.account_name.is_empty() {
        "Unknown:AccountFrom"
    } else {
        &bank.account_name
    };
    let show_total =
        !t.fee.is_zero() || twin_block_rendered || t.currency_raw != t.currency_account;
    if show_total {
        let currency = currency_info(config, &t.currency_account, &t.currency_account);
        lines.push(format!(
            "    {}  {}",
            account_from,
            amount_with_annotation(t, t.amount_account + t.fee, &currency, config)
        ));
    } else {
        lines.push(format!("    {}", account_from));
    }

    let mut entry = lines.join("\n");
    entry.push('\n');
    Ok(entry)
}
