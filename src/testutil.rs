//! Builders and fixtures shared by the module tests.

use rust_decimal::Decimal;

use crate::config::{Bank, Config};
use crate::transaction::Transaction;

/// Parses a dedented YAML fixture through the full load path (name
/// filling, hierarchy mapping, validation).
pub fn config_from_yaml(yaml: &str) -> Config {
    Config::from_yaml(&textwrap::dedent(yaml)).expect("test configuration did not load")
}

/// A bank profile with the fields most tests need filled in.
pub fn bank(name: &str) -> Bank {
    Bank {
        name: name.to_string(),
        account_name: "Assets:Fio".to_string(),
        fee_account_name: Some("Expenses:Fees".to_string()),
        date_pattern: "%d.%m.%Y".to_string(),
        ..Bank::default()
    }
}

/// Builds a `Transaction` for testing.
pub struct TransactionBuilder {
    t: Transaction,
}

pub fn transaction() -> TransactionBuilder {
    TransactionBuilder {
        t: Transaction::default(),
    }
}

impl TransactionBuilder {
    pub fn date_raw(mut self, date_raw: &str) -> Self {
        self.t.date_raw = date_raw.to_string();
        self
    }

    pub fn payee_raw(mut self, payee_raw: &str) -> Self {
        self.t.payee_raw = payee_raw.to_string();
        self
    }

    pub fn payment_type(mut self, payment_type: &str) -> Self {
        self.t.payment_type = payment_type.to_string();
        self
    }

    pub fn receiver_account_number(mut self, number: &str) -> Self {
        self.t.receiver_account_number = number.to_string();
        self
    }

    pub fn note_for_me(mut self, note: &str) -> Self {
        self.t.note_for_me = note.to_string();
        self
    }

    pub fn currency(mut self, raw: &str, account: &str) -> Self {
        self.t.currency_raw = raw.to_string();
        self.t.currency_account = account.to_string();
        self
    }

    pub fn amount_real(mut self, amount: &str) -> Self {
        self.t.amount_real = parse_decimal(amount);
        self
    }

    pub fn amount_account(mut self, amount: &str) -> Self {
        self.t.amount_account = parse_decimal(amount);
        self
    }

    pub fn fee(mut self, fee: &str) -> Self {
        self.t.fee = parse_decimal(fee);
        self
    }

    pub fn build(self) -> Transaction {
        self.t
    }
}

fn parse_decimal(s: &str) -> Decimal {
    s.parse().expect("test amount did not parse")
}
