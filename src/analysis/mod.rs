//! Static passes over compiled constraint trees. None of them need a snapshot.
pub mod scope;

pub use scope::{ScopeChecker, ScopeError};

use crate::tree::Expression;
use std::collections::BTreeSet;

/// Every resource name the tree reads, in sorted order.
pub fn referenced_resources<E: Expression>(expression: &E) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    expression.extract_resources(&mut names);
    names
}
