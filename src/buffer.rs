//! The twin-transaction buffer: a small accumulator holding the
//! transactions of one twin group until a non-matching transaction (or the
//! end of the stream) flushes them into a single ledger entry.

use anyhow::Result;

use crate::config::{Config, TwinRule};
use crate::render::{self, RenderContext, TwinGroup};
use crate::transaction::Transaction;

/// Holds either nothing (between groups) or an anchor transaction plus the
/// twins collected for it so far, together with the rule that opened it.
#[derive(Debug, Default)]
pub struct TransactionBuffer {
    transactions: Vec<Transaction>,
    twin: Option<TwinRule>,
}

impl TransactionBuffer {
    /// Opens a buffer holding the anchor transaction of a twin group.
    pub fn open(anchor: Transaction, rule: &TwinRule) -> TransactionBuffer {
        TransactionBuffer {
            transactions: vec![anchor],
            twin: Some(rule.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the transaction belongs to the open group: it matches any of
    /// the rule's continuation matchers and the buffer is under its limit
    /// (0 = unbounded).
    pub fn matches(&self, t: &Transaction, config: &Config) -> bool {
        match &self.twin {
            Some(rule) => {
                (rule.limit == 0 || self.len() < rule.limit)
                    && t.matches_any(&rule.matchers, config)
            }
            None => false,
        }
    }

    pub fn push(&mut self, t: Transaction) {
        self.transactions.push(t);
    }

    /// Renders the buffered group as one ledger entry. With `use_anchor`
    /// the first transaction is the primary line and the rest are twins;
    /// otherwise the last one is primary. A buffer that never collected a
    /// second transaction renders as an ordinary single entry.
    pub fn flush(self, ctx: &RenderContext) -> Result<String> {
        let n = self.transactions.len();
        if n == 0 {
            return Ok(String::new());
        }
        if n == 1 {
            return render::format_entry(&self.transactions[0], None, ctx);
        }

        let rule = self
            .twin
            .as_ref()
            .expect("a buffer with transactions always has its rule");
        let (primary, twins) = if rule.use_anchor {
            (&self.transactions[0], &self.transactions[1..])
        } else {
            (&self.transactions[n - 1], &self.transactions[..n - 1])
        };
        render::format_entry(
            primary,
            Some(TwinGroup {
                rule,
                transactions: twins,
            }),
            ctx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Matcher;
    use crate::testutil::{bank, config_from_yaml, transaction};

    fn rule_matching_payment_type(payment_type: &str, limit: usize) -> TwinRule {
        TwinRule {
            matchers: vec![Matcher {
                payment_type: Some(payment_type.to_string()),
                ..Matcher::default()
            }],
            limit,
            ..TwinRule::default()
        }
    }

    #[test]
    fn empty_buffer_matches_nothing() {
        let cfg = config_from_yaml("payees: {}\n");
        let buffer = TransactionBuffer::default();
        let t = transaction().payment_type("Exchange").build();
        assert!(!buffer.matches(&t, &cfg));
    }

    #[test]
    fn open_buffer_matches_by_rule_matchers() {
        let cfg = config_from_yaml("payees: {}\n");
        let rule = rule_matching_payment_type("Exchange", 0);
        let buffer =
            TransactionBuffer::open(transaction().payment_type("Exchange").build(), &rule);
        assert!(buffer.matches(&transaction().payment_type("Exchange").build(), &cfg));
        assert!(!buffer.matches(&transaction().payment_type("Card").build(), &cfg));
    }

    #[test]
    fn limit_closes_the_buffer() {
        let cfg = config_from_yaml("payees: {}\n");
        let rule = rule_matching_payment_type("Exchange", 2);
        let mut buffer =
            TransactionBuffer::open(transaction().payment_type("Exchange").build(), &rule);
        let twin = transaction().payment_type("Exchange").build();
        assert!(buffer.matches(&twin, &cfg));
        buffer.push(twin);
        assert!(!buffer.matches(&transaction().payment_type("Exchange").build(), &cfg));
    }

    #[test]
    fn zero_limit_is_unbounded() {
        let cfg = config_from_yaml("payees: {}\n");
        let rule = rule_matching_payment_type("Exchange", 0);
        let mut buffer =
            TransactionBuffer::open(transaction().payment_type("Exchange").build(), &rule);
        for _ in 0..10 {
            let twin = transaction().payment_type("Exchange").build();
            assert!(buffer.matches(&twin, &cfg));
            buffer.push(twin);
        }
    }

    #[test]
    fn use_anchor_selects_first_transaction_as_primary() {
        let cfg = config_from_yaml(
            r#"
            payees:
              Tesco:
                account: Expenses:Groceries
                payeeRaw: '^tesco'
            currencies:
              symbolMap:
                CZK:
                  to: Kc
            "#,
        );
        let b = bank("fio");
        let ctx = RenderContext {
            config: &cfg,
            bank: &b,
        };

        let first = transaction()
            .date_raw("01.02.2023")
            .payee_raw("TESCO A")
            .amount_account("-10")
            .amount_real("-10")
            .currency("CZK", "CZK")
            .build();
        let second = transaction()
            .date_raw("02.02.2023")
            .payee_raw("TESCO B")
            .amount_account("-5")
            .amount_real("-5")
            .currency("CZK", "CZK")
            .build();

        let anchored = TwinRule {
            use_anchor: true,
            ..TwinRule::default()
        };
        let mut buffer = TransactionBuffer::open(first.clone(), &anchored);
        buffer.push(second.clone());
        let entry = buffer.flush(&ctx).unwrap();
        assert!(entry.starts_with("2023/02/01"), "got: {}", entry);

        let tail = TwinRule::default();
        let mut buffer = TransactionBuffer::open(first, &tail);
        buffer.push(second);
        let entry = buffer.flush(&ctx).unwrap();
        assert!(entry.starts_with("2023/02/02"), "got: {}", entry);
    }

    #[test]
    fn degenerate_single_transaction_flushes_as_plain_entry() {
        let cfg = config_from_yaml(
            r#"
            payees:
              Tesco:
                account: Expenses:Groceries
                payeeRaw: '^tesco'
            currencies:
              symbolMap:
                CZK:
                  to: Kc
            "#,
        );
        let b = bank("fio");
        let ctx = RenderContext {
            config: &cfg,
            bank: &b,
        };
        let rule = TwinRule {
            kind: crate::config::TwinKind::Merge,
            use_anchor: true,
            ..TwinRule::default()
        };
        let buffer = TransactionBuffer::open(
            transaction()
                .date_raw("01.02.2023")
                .payee_raw("TESCO A")
                .amount_account("-10")
                .amount_real("-10")
                .currency("CZK", "CZK")
                .build(),
            &rule,
        );
        let entry = buffer.flush(&ctx).unwrap();
        assert_eq!(
            entry,
            "2023/02/01 * Tesco\n\
             \x20   Expenses:Groceries  10.00 Kc\n\
             \x20   Assets:Fio\n"
        );
    }
}
