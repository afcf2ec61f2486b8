//! The account hierarchy and the payee→account assignment walk.

use indexmap::IndexMap;
use tracing::warn;

use crate::config::payee::{Payee, PayeePattern};

/// One node of the `accounts` tree. The tree maps path segments to child
/// nodes, with payee names at the leaves in one of three shapes: a null
/// value (the segment name itself is the payee), a single name, or a list
/// of names.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum AccountNode {
    Leaf(String),
    Payees(Vec<String>),
    Tree(IndexMap<String, Option<AccountNode>>),
}

impl Default for AccountNode {
    fn default() -> Self {
        AccountNode::Tree(IndexMap::new())
    }
}

/// Walks the accounts hierarchy once at load time and assigns every payee
/// named in a leaf to the account path leading there. Path segments are
/// joined with `:`; a segment literally named `self` contributes no segment
/// of its own, so its payees land on the parent path.
///
/// Names already present in the catalogue get the account only if they have
/// none yet; a conflicting second assignment is dropped with a warning.
/// Names not present are created as implicit payees whose sole
/// classification pattern is the exact-name anchor `^name$`.
pub fn map_payees(tree: &AccountNode, prefix: &str, payees: &mut IndexMap<String, Payee>) {
    let AccountNode::Tree(children) = tree else {
        return;
    };
    for (key, value) in children {
        let child_path = child_path(prefix, key);
        match value {
            None => assign(key, &child_path, payees),
            Some(AccountNode::Leaf(name)) => assign(name, &child_path, payees),
            Some(AccountNode::Payees(names)) => {
                for name in names {
                    assign(name, &child_path, payees);
                }
            }
            Some(node @ AccountNode::Tree(_)) => map_payees(node, &child_path, payees),
        }
    }
}

fn child_path(prefix: &str, key: &str) -> String {
    if key == "self" {
        prefix.to_string()
    } else if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

fn assign(name: &str, path: &str, payees: &mut IndexMap<String, Payee>) {
    match payees.get_mut(name) {
        Some(payee) => match &payee.account {
            Some(existing) if existing != path => warn!(
                payee = %name,
                assigned = %existing,
                conflicting = %path,
                "payee already has an assigned account; keeping the first"
            ),
            _ => payee.account = Some(path.to_string()),
        },
        None => {
            let payee = Payee {
                name: name.to_string(),
                account: Some(path.to_string()),
                payee_raw: vec![PayeePattern::new(format!("^{}$", regex::escape(name)))],
                ..Payee::default()
            };
            payees.insert(name.to_string(), payee);
        }
    }
}
