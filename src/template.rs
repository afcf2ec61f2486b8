//! Sandboxed text templates for account paths, payee display text, and meta
//! values. Templates see a fixed context of bank, transaction, and payee
//! fields; no host functions are registered, so a template can substitute
//! text and nothing else.

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::{Bank, Payee};
use crate::transaction::Transaction;

#[derive(Debug, Serialize)]
pub struct BankContext<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub payee_name: &'a str,
    pub account_name: &'a str,
    pub fee_account_name: &'a str,
    pub templates: &'a IndexMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionContext<'a> {
    pub date_raw: &'a str,
    pub payee_raw: &'a str,
    pub currency_raw: &'a str,
    pub currency_account: &'a str,
    pub payment_type: &'a str,
    pub amount_real: Decimal,
    pub amount_account: Decimal,
    pub fee: Decimal,
    pub receiver_account_number: &'a str,
    pub note_for_me: &'a str,
    pub note_for_receiver: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PayeeContext<'a> {
    pub name: &'a str,
    pub account: Option<&'a str>,
}

/// Everything a template may reference.
#[derive(Debug, Serialize)]
pub struct TemplateContext<'a> {
    pub bank: BankContext<'a>,
    pub transaction: TransactionContext<'a>,
    pub payee: PayeeContext<'a>,
}

pub fn context<'a>(bank: &'a Bank, transaction: &'a Transaction, payee: &'a Payee) -> TemplateContext<'a> {
    let display_name = bank
        .display_name
        .as_deref()
        .or(bank.payee_name.as_deref())
        .unwrap_or(&bank.name);
    TemplateContext {
        bank: BankContext {
            name: &bank.name,
            display_name,
            payee_name: bank.payee_name.as_deref().unwrap_or(""),
            account_name: &bank.account_name,
            fee_account_name: bank.fee_account_name.as_deref().unwrap_or(""),
            templates: &bank.templates,
        },
        transaction: TransactionContext {
            date_raw: &transaction.date_raw,
            payee_raw: &transaction.payee_raw,
            currency_raw: &transaction.currency_raw,
            currency_account: &transaction.currency_account,
            payment_type: &transaction.payment_type,
            amount_real: transaction.amount_real,
            amount_account: transaction.amount_account,
            fee: transaction.fee,
            receiver_account_number: &transaction.receiver_account_number,
            note_for_me: &transaction.note_for_me,
            note_for_receiver: &transaction.note_for_receiver,
        },
        payee: PayeeContext {
            name: &payee.name,
            account: payee.account.as_deref(),
        },
    }
}

pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let env = minijinja::Environment::new();
    env.render_str(template, ctx)
        .map_err(|e| anyhow!("rendering template {:?}: {}", template, e))
}

lazy_static! {
    static ref ALIAS: Regex = Regex::new(r"\{([^{}\s]+)\}").unwrap();
}

/// Substitutes `{alias}` tokens through a bank's template table. Tokens with
/// no table entry pass through literally.
pub fn resolve_aliases(text: &str, templates: &IndexMap<String, String>) -> String {
    ALIAS
        .replace_all(text, |caps: &Captures| match templates.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bank, transaction};

    #[test]
    fn renders_bank_and_payee_fields() {
        let bank = bank("fio");
        let t = transaction().payee_raw("TESCO PRAHA").build();
        let payee = Payee {
            name: "Tesco".to_string(),
            ..Payee::default()
        };
        let out = render(
            "{{ payee.name }} via {{ bank.display_name }} ({{ transaction.payee_raw }})",
            &context(&bank, &t, &payee),
        )
        .unwrap();
        assert_eq!(out, "Tesco via fio (TESCO PRAHA)");
    }

    #[test]
    fn display_name_falls_back_to_payee_name_then_bank_name() {
        let mut b = bank("fio");
        b.payee_name = Some("Fio banka".to_string());
        let t = transaction().build();
        let payee = Payee::default();
        let out = render("{{ bank.display_name }}", &context(&b, &t, &payee)).unwrap();
        assert_eq!(out, "Fio banka");

        b.display_name = Some("Fio".to_string());
        let out = render("{{ bank.display_name }}", &context(&b, &t, &payee)).unwrap();
        assert_eq!(out, "Fio");
    }

    #[test]
    fn alias_tokens_resolve_through_bank_templates() {
        let mut templates = IndexMap::new();
        templates.insert("groceries".to_string(), "Expenses:Groceries".to_string());
        assert_eq!(
            resolve_aliases("{groceries}", &templates),
            "Expenses:Groceries"
        );
        assert_eq!(
            resolve_aliases("{groceries}:Snacks", &templates),
            "Expenses:Groceries:Snacks"
        );
    }

    #[test]
    fn unresolved_alias_passes_through() {
        let templates = IndexMap::new();
        assert_eq!(resolve_aliases("{missing}", &templates), "{missing}");
        assert_eq!(resolve_aliases("Expenses:Plain", &templates), "Expenses:Plain");
    }
}
