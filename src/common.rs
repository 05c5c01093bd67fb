//! Common utilities shared across read, write and transaction operations.
//!
//! The central type here is the expression fragment: an expression string
//! together with the attribute-name and attribute-value placeholder maps it
//! references. Every expression kind this crate builds (key condition, filter,
//! condition, projection, update) compiles down to fragments and merges them.

/// Condition expression building for filters and conditional writes.
pub mod condition;

/// Key types: logical key composition and physical primary keys.
pub mod key;

/// Attribute projection for read operations.
pub mod projection;

use aws_sdk_dynamodb::types;
use std::collections;

/// A map of physical attribute names to stored values, as one item.
pub type Attributes = collections::HashMap<String, types::AttributeValue>;

/// Placeholder prefix for key condition expressions.
pub const KEY_PREFIX: &str = "k";
/// Placeholder prefix for filter expressions on query/scan.
pub const FILTER_PREFIX: &str = "f";
/// Placeholder prefix for condition expressions on writes.
pub const CONDITION_PREFIX: &str = "c";
/// Placeholder prefix for projection expressions.
pub const PROJECTION_PREFIX: &str = "p";
/// Placeholder prefix for update expressions.
pub const UPDATE_PREFIX: &str = "u";

/// Attribute-name placeholder for a property in the given context.
///
/// The prefix keeps the same property usable in several expression kinds of
/// one request: `#f_status` in a filter never collides with `#c_status` in a
/// condition.
pub(crate) fn name_placeholder(prefix: &str, property: &str) -> String {
    format!("#{prefix}_{property}")
}

/// Attribute-value placeholder root for a property in the given context.
///
/// Operations that bind several values (`Between`, `In`) append their own
/// suffixes to this root.
pub(crate) fn value_placeholder(prefix: &str, property: &str) -> String {
    format!(":{prefix}_{property}")
}

/// One compiled expression piece: the expression string plus the placeholder
/// maps it references.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionFragment {
    pub(crate) expression: String,
    pub(crate) names: collections::HashMap<String, String>,
    pub(crate) values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionFragment {
    /// Append another fragment, joining the expression strings with the given
    /// operator unless either side is empty.
    pub(crate) fn append(&mut self, operator: &str, other: Self) {
        self.names.extend(other.names);
        self.values.extend(other.values);
        if self.expression.is_empty() {
            self.expression = other.expression;
        } else if !other.expression.is_empty() {
            self.expression = format!("{}{}{}", self.expression, operator, other.expression);
        }
    }

    /// Join a sequence of fragments with one operator.
    pub(crate) fn join(operator: &str, fragments: Vec<Self>) -> Self {
        let mut merged = Self::default();
        for fragment in fragments {
            merged.append(operator, fragment);
        }
        merged
    }

    /// Drain this fragment's placeholder maps into optional request-level
    /// maps, returning the expression string.
    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> String {
        match names {
            Some(existing) => existing.extend(self.names),
            None => *names = Some(self.names),
        }
        if !self.values.is_empty() {
            match values {
                Some(existing) => existing.extend(self.values),
                None => *values = Some(self.values),
            }
        }
        self.expression
    }
}
