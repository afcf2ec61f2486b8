//! One parsed bank record, its payee resolution, and the classification
//! tests the processing loop drives (ignore rules, twin anchors, transfers
//! between the user's own accounts).

use std::cell::OnceCell;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use crate::config::{Bank, ColumnIndices, Config, Matcher, Meta, PatternKind, Payee, TwinRule};

/// The outcome of classifying a transaction against the payee catalogue.
/// `found` is false only for the synthesized placeholder payee.
#[derive(Clone, Debug)]
pub struct ResolvedPayee {
    pub payee: Payee,
    pub pattern: Option<MatchedPattern>,
    pub found: bool,
}

/// Which pattern classified the transaction, carrying any pattern-level
/// meta override.
#[derive(Clone, Debug)]
pub struct MatchedPattern {
    pub kind: PatternKind,
    pub value: String,
    pub meta: Option<Meta>,
}

/// Immutable snapshot of one CSV record. Amounts are lenient: anything that
/// fails to parse reads as zero rather than failing the record.
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    pub date_raw: String,
    pub payee_raw: String,
    pub currency_raw: String,
    pub currency_account: String,
    pub payment_type: String,

    pub amount_real: Decimal,
    pub amount_account: Decimal,
    pub fee: Decimal,

    pub receiver_account_number: String,
    pub note_for_me: String,
    pub note_for_receiver: String,

    /// Memoized payee resolution, written exactly once on first use.
    resolved: OnceCell<ResolvedPayee>,
}

/// Accepts `1 234,56` style values. Unparseable input reads as zero.
fn parse_amount(text: &str) -> Decimal {
    let normalized: String = text
        .replace(',', ".")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    normalized.parse().unwrap_or_default()
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .unwrap_or("")
}

impl Transaction {
    pub fn from_record(record: &csv::StringRecord, columns: &ColumnIndices) -> Transaction {
        let amount_account_raw = field(record, columns.amount_account);
        let mut amount_real_raw = field(record, columns.amount_real);
        if amount_real_raw.is_empty() {
            amount_real_raw = amount_account_raw;
        }

        let currency_raw = field(record, columns.currency_raw).to_string();
        let mut currency_account = field(record, columns.currency_account).to_string();
        if currency_account.is_empty() {
            currency_account = currency_raw.clone();
        }

        Transaction {
            date_raw: field(record, columns.date_raw).to_string(),
            payee_raw: field(record, columns.payee_raw).to_string(),
            currency_raw,
            currency_account,
            payment_type: field(record, columns.payment_type).to_string(),
            amount_account: parse_amount(amount_account_raw),
            amount_real: parse_amount(amount_real_raw),
            fee: parse_amount(field(record, columns.fee)),
            receiver_account_number: field(record, columns.receiver_account_number).to_string(),
            note_for_me: field(record, columns.note_for_me).to_string(),
            note_for_receiver: field(record, columns.note_for_receiver).to_string(),
            resolved: OnceCell::new(),
        }
    }

    /// The date rendered in `%Y/%m/%d` journal form. A value the bank's
    /// date pattern cannot parse passes through as-is; a bad row must not
    /// lose the rest of the file.
    pub fn format_date(&self, bank: &Bank) -> String {
        match NaiveDate::parse_from_str(&self.date_raw, &bank.date_pattern) {
            Ok(date) => date.format("%Y/%m/%d").to_string(),
            Err(_) => {
                warn!(date = %self.date_raw, bank = %bank.name, "date did not match the bank's date pattern");
                self.date_raw.clone()
            }
        }
    }

    /// Finds the payee classifying this transaction, memoizing the result.
    ///
    /// The catalogue is scanned in insertion order; per payee, pattern
    /// groups apply in fixed precedence order (payeeRaw, then
    /// receiverAccountNumber, then paymentType, then noteForMe) and the
    /// first match anywhere wins. Failing that, the raw-payee remap table
    /// is consulted. Failing that too, a placeholder payee is synthesized.
    pub fn resolve_payee(&self, config: &Config) -> &ResolvedPayee {
        self.resolved.get_or_init(|| self.classify(config))
    }

    fn classify(&self, config: &Config) -> ResolvedPayee {
        for payee in config.payees.values() {
            for (kind, patterns) in payee.pattern_groups() {
                for pattern in patterns {
                    if self.pattern_matches(kind, &pattern.value) {
                        return ResolvedPayee {
                            payee: payee.clone(),
                            pattern: Some(MatchedPattern {
                                kind,
                                value: pattern.value.clone(),
                                meta: pattern.meta.clone(),
                            }),
                            found: true,
                        };
                    }
                }
            }
        }

        for (pattern, target) in &config.to_payee_raw.pattern {
            if regex_matches(pattern, &self.payee_raw) {
                if let Some(payee) = config.payees.get(target) {
                    return ResolvedPayee {
                        payee: payee.clone(),
                        pattern: Some(MatchedPattern {
                            kind: PatternKind::PayeeRaw,
                            value: pattern.clone(),
                            meta: None,
                        }),
                        found: true,
                    };
                }
            }
        }

        ResolvedPayee {
            payee: Payee::unknown(&self.payee_raw),
            pattern: None,
            found: false,
        }
    }

    fn pattern_matches(&self, kind: PatternKind, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }
        match kind {
            PatternKind::PayeeRaw => regex_matches(pattern, &self.payee_raw),
            PatternKind::ReceiverAccountNumber => pattern == self.receiver_account_number,
            PatternKind::PaymentType => pattern == self.payment_type,
            PatternKind::NoteForMe => regex_matches(pattern, &self.note_for_me),
        }
    }

    /// Whether every non-empty constraint of the matcher equals the
    /// corresponding transaction field.
    pub fn matches(&self, matcher: &Matcher, config: &Config) -> bool {
        fn holds(constraint: &Option<String>, actual: &str) -> bool {
            match constraint.as_deref() {
                None | Some("") => true,
                Some(want) => want == actual,
            }
        }

        let payee_holds = match matcher.payee.as_deref() {
            None | Some("") => true,
            Some(want) => self.resolve_payee(config).payee.name == want,
        };

        payee_holds
            && holds(&matcher.payment_type, &self.payment_type)
            && holds(
                &matcher.receiver_account_number,
                &self.receiver_account_number,
            )
            && holds(&matcher.payee_raw, &self.payee_raw)
            && holds(&matcher.note_for_me, &self.note_for_me)
            && holds(&matcher.note_for_receiver, &self.note_for_receiver)
    }

    pub fn matches_any(&self, matchers: &[Matcher], config: &Config) -> bool {
        matchers.iter().any(|m| self.matches(m, config))
    }

    /// True iff any ignore rule of the bank matches. A rule with zero
    /// matchers never matches anything.
    pub fn is_ignored(&self, bank: &Bank, config: &Config) -> bool {
        bank.ignored_transactions
            .iter()
            .any(|rule| !rule.matchers.is_empty() && self.matches_any(&rule.matchers, config))
    }

    /// The first twin rule (in bank-config order) whose anchor set matches,
    /// if any.
    pub fn twin_anchor<'b>(&self, bank: &'b Bank, config: &Config) -> Option<&'b TwinRule> {
        bank.twin_transactions
            .iter()
            .find(|rule| !rule.anchor.is_empty() && self.matches_any(&rule.anchor, config))
    }

    /// The bank this transaction moves money to or from within the user's
    /// own accounts, if its resolved payee is linked to one.
    pub fn own_account_transfer<'c>(&self, config: &'c Config) -> Option<&'c Bank> {
        let resolved = self.resolve_payee(config);
        if !resolved.found {
            return None;
        }
        config
            .banks
            .values()
            .find(|bank| bank.payee_name.as_deref() == Some(resolved.payee.name.as_str()))
    }
}

fn regex_matches(pattern: &str, text: &str) -> bool {
    match crate::config::compile_pattern(pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => {
            // Load-time validation compiles every configured pattern, so
            // this only fires for patterns injected after load.
            warn!(pattern = %pattern, "invalid pattern skipped while matching");
            false
        }
    }
}
