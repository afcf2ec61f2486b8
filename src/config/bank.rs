//! Per-bank profiles: CSV column layout, matcher rules for ignoring and
//! twin-transaction grouping, and auto-detection data.

use indexmap::IndexMap;
use serde::Deserialize;

/// Positions of the transaction fields within one CSV record. `None` means
/// the bank's export has no such column; the field reads as empty.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnIndices {
    pub date_raw: Option<usize>,
    pub payee_raw: Option<usize>,
    pub currency_raw: Option<usize>,
    pub currency_account: Option<usize>,
    pub payment_type: Option<usize>,
    pub amount_real: Option<usize>,
    pub amount_account: Option<usize>,
    pub fee: Option<usize>,
    pub receiver_account_number: Option<usize>,
    pub note_for_me: Option<usize>,
    pub note_for_receiver: Option<usize>,
}

/// Header-cell names the transaction fields are found under, for banks whose
/// exports carry a header row instead of a fixed layout.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnNames {
    pub date_raw: String,
    pub payee_raw: String,
    pub currency_raw: String,
    pub currency_account: String,
    pub payment_type: String,
    pub amount_real: String,
    pub amount_account: String,
    pub fee: String,
    pub receiver_account_number: String,
    pub note_for_me: String,
    pub note_for_receiver: String,
}

/// A conjunction of optional exact-match constraints on transaction fields.
/// Unset (or empty) fields are not checked, so a matcher with no fields set
/// holds vacuously; rules guard against that by requiring at least one
/// matcher before they can fire.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Matcher {
    pub payment_type: Option<String>,
    pub receiver_account_number: Option<String>,
    pub payee_raw: Option<String>,
    /// Matches the transaction's *resolved* payee name.
    pub payee: Option<String>,
    pub note_for_me: Option<String>,
    pub note_for_receiver: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TwinKind {
    /// Fold the buffered twins' amounts into the primary line's amount.
    #[default]
    Sum,
    /// Emit one extra posting line per buffered twin.
    Merge,
}

/// Groups related consecutive transactions (fees, splits, paired transfer
/// legs) into one ledger entry. A transaction matching any `anchor` matcher
/// opens a buffer; following transactions matching any of `matchers` join
/// it, up to `limit` buffered transactions (0 = unbounded).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TwinRule {
    #[serde(rename = "type")]
    pub kind: TwinKind,
    pub inverted: bool,
    pub anchor: Vec<Matcher>,
    pub matchers: Vec<Matcher>,
    /// Selects the first buffered transaction as the rendered primary line;
    /// otherwise the last one is primary.
    pub use_anchor: bool,
    pub limit: usize,
}

/// Transactions matching any matcher of an ignore rule are dropped before
/// classification. A rule with zero matchers never matches anything.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct IgnoreRule {
    pub matchers: Vec<Matcher>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Bank {
    /// Filled in from the configuration key after parsing.
    #[serde(skip)]
    pub name: String,

    /// Name rendered into payee templates; falls back to `payee_name`, then
    /// to `name`.
    pub display_name: Option<String>,

    /// Links the bank itself to a payee, marking transactions between the
    /// user's own accounts.
    pub payee_name: Option<String>,

    /// The checking account all entries of this bank post from.
    #[serde(rename = "checkingAccountName")]
    pub account_name: String,

    /// The account accruing this bank's fees.
    #[serde(rename = "feeAccountName")]
    pub fee_account_name: Option<String>,

    /// Alias table for `{alias}` tokens inside account texts.
    pub templates: IndexMap<String, String>,

    /// chrono strftime pattern the `dateRaw` column is parsed with.
    /// Required; validated at load time.
    pub date_pattern: String,

    /// Regex matched against the input file name to auto-select this bank.
    pub file_name_pattern: Option<String>,

    /// Leading header cells used to auto-identify the bank from file
    /// content.
    pub identifying_columns: Vec<String>,

    /// Character encoding of this bank's exports (an encoding_rs label such
    /// as `windows-1252`). UTF-8 when absent.
    pub encoding: Option<String>,

    pub column_names: ColumnNames,
    pub column_indices: Option<ColumnIndices>,

    pub twin_transactions: Vec<TwinRule>,
    pub ignored_transactions: Vec<IgnoreRule>,
}

impl Bank {
    /// Derives column positions by matching the configured column names
    /// against a header row. Names left empty in the config stay unmapped.
    pub fn indices_from_header(&self, header: &csv::StringRecord) -> ColumnIndices {
        let find = |name: &str| -> Option<usize> {
            if name.is_empty() {
                return None;
            }
            header.iter().position(|cell| cell == name)
        };
        let names = &self.column_names;
        ColumnIndices {
            date_raw: find(&names.date_raw),
            payee_raw: find(&names.payee_raw),
            currency_raw: find(&names.currency_raw),
            currency_account: find(&names.currency_account),
            payment_type: find(&names.payment_type),
            amount_real: find(&names.amount_real),
            amount_account: find(&names.amount_account),
            fee: find(&names.fee),
            receiver_account_number: find(&names.receiver_account_number),
            note_for_me: find(&names.note_for_me),
            note_for_receiver: find(&names.note_for_receiver),
        }
    }

    /// Whether the leading cells of `header` equal this bank's identifying
    /// columns, in order. Banks without identifying columns never match.
    pub fn identifies(&self, header: &csv::StringRecord) -> bool {
        if self.identifying_columns.is_empty() || self.identifying_columns.len() > header.len() {
            return false;
        }
        self.identifying_columns
            .iter()
            .zip(header.iter())
            .all(|(want, got)| want == got)
    }
}
