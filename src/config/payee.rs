//! The payee catalogue: classification patterns and account/text templates.
//!
//! The YAML form allows several shorthands; they are all collapsed into the
//! canonical [`Payee`] representation while the document is being
//! deserialized, so nothing downstream ever branches on the raw shape.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// Metadata key/value pairs emitted as `; Key: Value` comment lines under a
/// ledger entry header. Values may contain template expressions.
pub type Meta = IndexMap<String, String>;

/// One classification pattern within a pattern group. Regex groups
/// (`payeeRaw`, `noteForMe`) interpret `value` as a case-insensitive regex;
/// the other groups compare it verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayeePattern {
    pub value: String,
    /// Overrides the payee-level meta for transactions matched by this
    /// pattern.
    pub meta: Option<Meta>,
}

impl PayeePattern {
    pub fn new<S: Into<String>>(value: S) -> Self {
        PayeePattern {
            value: value.into(),
            meta: None,
        }
    }
}

/// The pattern group a payee was matched through, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternKind {
    PayeeRaw,
    ReceiverAccountNumber,
    PaymentType,
    NoteForMe,
}

impl PatternKind {
    /// Regex groups match case-insensitively; the rest compare exactly.
    pub fn is_regex(self) -> bool {
        matches!(self, PatternKind::PayeeRaw | PatternKind::NoteForMe)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payee {
    /// Unique identity, filled in from the catalogue key after parsing.
    pub name: String,

    /// Ledger account the payee posts against. Normally assigned through
    /// the `accounts` hierarchy; may also be set directly.
    pub account: Option<String>,

    /// Template string for dynamically generated accounts. Takes precedence
    /// over `account` when present.
    pub account_template: Option<String>,

    /// Template string used to generate the rendered payee text.
    pub template: Option<String>,

    /// Free-text reminder appended to the entry header line.
    pub note: Option<String>,

    pub payee_raw: Vec<PayeePattern>,
    pub receiver_account_number: Vec<PayeePattern>,
    pub payment_type: Vec<PayeePattern>,
    pub note_for_me: Vec<PayeePattern>,

    pub meta: Option<Meta>,
}

impl Payee {
    /// Pattern groups in fixed match-precedence order.
    pub fn pattern_groups(&self) -> [(PatternKind, &[PayeePattern]); 4] {
        [
            (PatternKind::PayeeRaw, self.payee_raw.as_slice()),
            (
                PatternKind::ReceiverAccountNumber,
                self.receiver_account_number.as_slice(),
            ),
            (PatternKind::PaymentType, self.payment_type.as_slice()),
            (PatternKind::NoteForMe, self.note_for_me.as_slice()),
        ]
    }

    /// Placeholder payee for transactions no configured payee classifies.
    /// Carries the raw payee text so the entry stays identifiable, and a
    /// fallback account so rendering never fails on it.
    pub fn unknown(payee_raw: &str) -> Payee {
        Payee {
            name: format!("Unknown payee ;{}", payee_raw),
            account: Some("Unknown:Account".to_string()),
            ..Payee::default()
        }
    }
}

/// YAML shorthands for a whole payee: a bare string is a single `payeeRaw`
/// pattern, a bare list is several, anything else is the full mapping form.
#[derive(Deserialize)]
#[serde(untagged)]
enum PayeeDe {
    Pattern(String),
    Patterns(Vec<String>),
    Full(PayeeFull),
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PayeeFull {
    account: Option<String>,
    account_template: Option<String>,
    template: Option<String>,
    note: Option<String>,
    payee_raw: PatternList,
    receiver_account_number: PatternList,
    payment_type: PatternList,
    note_for_me: PatternList,
    meta: Option<Meta>,
}

impl<'de> Deserialize<'de> for Payee {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let payee = match PayeeDe::deserialize(d)? {
            PayeeDe::Pattern(value) => Payee {
                payee_raw: vec![PayeePattern::new(value)],
                ..Payee::default()
            },
            PayeeDe::Patterns(values) => Payee {
                payee_raw: values.into_iter().map(PayeePattern::new).collect(),
                ..Payee::default()
            },
            PayeeDe::Full(full) => Payee {
                name: String::new(),
                account: full.account,
                account_template: full.account_template,
                template: full.template,
                note: full.note,
                payee_raw: full.payee_raw.0,
                receiver_account_number: full.receiver_account_number.0,
                payment_type: full.payment_type.0,
                note_for_me: full.note_for_me.0,
                meta: full.meta,
            },
        };
        Ok(payee)
    }
}

/// A pattern group: either one bare pattern or a list of patterns, each of
/// which may attach meta via a `pattern: {key: value}` map entry.
#[derive(Default)]
struct PatternList(Vec<PayeePattern>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternListDe {
    One(PatternDe),
    Many(Vec<PatternDe>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternDe {
    Bare(String),
    WithMeta(IndexMap<String, Meta>),
}

impl PatternDe {
    fn append_to(self, patterns: &mut Vec<PayeePattern>) {
        match self {
            PatternDe::Bare(value) => patterns.push(PayeePattern::new(value)),
            PatternDe::WithMeta(entries) => {
                for (value, meta) in entries {
                    patterns.push(PayeePattern {
                        value,
                        meta: Some(meta),
                    });
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for PatternList {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let mut patterns = Vec::new();
        match PatternListDe::deserialize(d)? {
            PatternListDe::One(p) => p.append_to(&mut patterns),
            PatternListDe::Many(ps) => {
                for p in ps {
                    p.append_to(&mut patterns);
                }
            }
        }
        Ok(PatternList(patterns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> IndexMap<String, Payee> {
        serde_yaml::from_str(&textwrap::dedent(yaml)).expect("test YAML did not parse")
    }

    #[test]
    fn bare_string_is_payee_raw_pattern() {
        let payees = parse(
            r#"
            TIGER: '^tiger.*?'
            "#,
        );
        assert_eq!(
            payees["TIGER"].payee_raw,
            vec![PayeePattern::new("^tiger.*?")]
        );
        assert!(payees["TIGER"].receiver_account_number.is_empty());
    }

    #[test]
    fn bare_list_is_several_payee_raw_patterns() {
        let payees = parse(
            r#"
            TIGER: ['^tiger.*?', '^tyger']
            "#,
        );
        assert_eq!(
            payees["TIGER"].payee_raw,
            vec![PayeePattern::new("^tiger.*?"), PayeePattern::new("^tyger")]
        );
    }

    #[test]
    fn full_form_with_string_group() {
        let payees = parse(
            r#"
            TIGER:
              payeeRaw: '^tiger.*?'
            "#,
        );
        assert_eq!(
            payees["TIGER"].payee_raw,
            vec![PayeePattern::new("^tiger.*?")]
        );
    }

    #[test]
    fn full_form_with_receiver_account_number() {
        let payees = parse(
            r#"
            TIGER:
              receiverAccountNumber: '1234/567'
            "#,
        );
        assert!(payees["TIGER"].payee_raw.is_empty());
        assert_eq!(
            payees["TIGER"].receiver_account_number,
            vec![PayeePattern::new("1234/567")]
        );
    }

    #[test]
    fn pattern_with_meta() {
        let payees = parse(
            r#"
            TIGER:
              payeeRaw:
                - '^tiger.*?':
                    Location: Prague
            "#,
        );
        let pattern = &payees["TIGER"].payee_raw[0];
        assert_eq!(pattern.value, "^tiger.*?");
        let meta = pattern.meta.as_ref().unwrap();
        assert_eq!(meta["Location"], "Prague");
    }

    #[test]
    fn full_form_account_and_templates() {
        let payees = parse(
            r#"
            Hotel:
              accountTemplate: 'Expenses:Hotel:{{ transaction.payee_raw }}'
              template: 'Hotel via {{ bank.display_name }}'
              paymentType: 'CARD'
            "#,
        );
        let p = &payees["Hotel"];
        assert_eq!(
            p.account_template.as_deref(),
            Some("Expenses:Hotel:{{ transaction.payee_raw }}")
        );
        assert_eq!(p.template.as_deref(), Some("Hotel via {{ bank.display_name }}"));
        assert_eq!(p.payment_type, vec![PayeePattern::new("CARD")]);
        assert_eq!(p.account, None);
    }

    #[test]
    fn unknown_payee_carries_raw_text_and_fallback_account() {
        let p = Payee::unknown("ACME s.r.o.");
        assert_eq!(p.name, "Unknown payee ;ACME s.r.o.");
        assert_eq!(p.account.as_deref(), Some("Unknown:Account"));
        assert!(p.payee_raw.is_empty());
    }
}
