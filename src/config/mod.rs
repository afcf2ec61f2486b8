//! The configuration model: one YAML document describing the account
//! hierarchy, the payee catalogue, bank profiles, and currency symbols.
//! Loaded once, immutable afterwards, and shared by reference with every
//! per-transaction resolution.

use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

pub mod accounts;
pub mod bank;
pub mod payee;

pub use accounts::AccountNode;
pub use bank::{Bank, ColumnIndices, IgnoreRule, Matcher, TwinKind, TwinRule};
pub use payee::{Meta, PatternKind, Payee, PayeePattern};

/// Display rules for one currency: the symbol it is rendered as and whether
/// that symbol goes in front of the number.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SymbolMap {
    pub to: String,
    pub in_front: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Currencies {
    pub symbol_map: IndexMap<String, SymbolMap>,
    /// The journal's reference currency symbol. Amounts rendered in any
    /// other currency get an `@ rate` exchange annotation against it.
    pub reference: Option<String>,
}

/// Free-form remap table: raw-payee regex → payee name. Consulted when no
/// catalogue pattern classifies a transaction.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RemapTable {
    pub pattern: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub accounts: AccountNode,
    pub payees: IndexMap<String, Payee>,
    pub to_payee_raw: RemapTable,
    pub currencies: Currencies,
    pub banks: IndexMap<String, Bank>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {:?}", path))?;
        Self::from_yaml(&text).with_context(|| format!("loading configuration {:?}", path))
    }

    /// Parses the document and runs all load-time fixups and validation:
    /// names are filled in from map keys, bank payees are linked, the
    /// account hierarchy is walked, and the remap table, pattern regexes,
    /// and bank date patterns are checked. Configuration-author errors are
    /// fatal here; nothing is validated lazily later.
    pub fn from_yaml(text: &str) -> Result<Config> {
        let mut cfg: Config = serde_yaml::from_str(text).context("parsing configuration")?;

        for (name, payee) in cfg.payees.iter_mut() {
            payee.name = name.clone();
        }

        for (name, bank) in cfg.banks.iter_mut() {
            bank.name = name.clone();
            if let Some(payee_name) = &bank.payee_name {
                match cfg.payees.get_mut(payee_name) {
                    Some(payee) => {
                        if payee.account.is_none() {
                            payee.account = Some(bank.account_name.clone());
                        }
                    }
                    None => warn!(
                        bank = %name,
                        payee = %payee_name,
                        "bank is linked to a payee that is not configured"
                    ),
                }
            }
        }

        accounts::map_payees(&cfg.accounts, "", &mut cfg.payees);

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        for (pattern, target) in &self.to_payee_raw.pattern {
            compile_pattern(pattern)
                .with_context(|| format!("raw-payee remap pattern {:?}", pattern))?;
            if !self.payees.contains_key(target) {
                bail!(
                    "regexp-mapped raw payee `{}` (from `{}`) does not exist \
                     in the payee or account maps",
                    target,
                    pattern
                );
            }
        }

        for payee in self.payees.values() {
            for (kind, patterns) in payee.pattern_groups() {
                if !kind.is_regex() {
                    continue;
                }
                for pattern in patterns {
                    compile_pattern(&pattern.value).with_context(|| {
                        format!("pattern {:?} of payee `{}`", pattern.value, payee.name)
                    })?;
                }
            }
        }

        for bank in self.banks.values() {
            if bank.date_pattern.is_empty() {
                bail!("datePattern is not set for bank `{}`", bank.name);
            }
            if let Some(pattern) = &bank.file_name_pattern {
                Regex::new(pattern)
                    .with_context(|| format!("fileNamePattern of bank `{}`", bank.name))?;
            }
        }

        Ok(())
    }

    /// Payees that would fail account resolution at render time. The
    /// `check` subcommand reports these; `import` fails on first use.
    pub fn payees_without_account(&self) -> Vec<&Payee> {
        self.payees
            .values()
            .filter(|p| p.account.is_none() && p.account_template.is_none())
            .collect()
    }
}

/// Compiles a payee classification pattern the way the resolver matches it:
/// case-insensitively.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){}", pattern)).map_err(Into::into)
}
