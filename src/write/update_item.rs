//! Update item operation and the update expression compiler.
//!
//! An update is described by three property categories - plain value
//! assignments, removals, and atomic operations evaluated server-side against
//! the stored value. The compiler emits the store's single-string multi-clause
//! syntax in fixed order SET, ADD, DELETE, REMOVE, each keyword at most once,
//! and rejects malformed descriptions before any request is built.

use crate::{common, error, store, write};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::collections;

/// An operation evaluated server-side against the attribute's stored value.
#[derive(Clone, Debug, PartialEq)]
pub enum AtomicKind<T> {
    /// Add to a number or union into a set, creating the attribute if absent.
    Add(T),
    /// Union the given values into a string or number set.
    AddToSet(T),
    /// Remove the given values from a string or number set.
    RemoveFromSet(T),
    /// Assign the value only when the attribute does not exist yet.
    SetIfNotExists(T),
    /// Subtract the value from the stored number.
    Subtract(T),
    /// Add the value to the stored number.
    Sum(T),
}

/// One atomic operation against one property.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicOperation<T> {
    /// The property the operation applies to.
    pub property: String,
    /// The operation itself.
    pub kind: AtomicKind<T>,
}

/// What an update changes.
///
/// The three categories are mutually exclusive: a property may appear in at
/// most one of them, at most once, and at least one category must be
/// non-empty.
///
/// ```rust
/// use dynamodb_single_table::write::update_item;
/// use indexmap::IndexMap;
/// use serde_json::json;
///
/// let update = update_item::UpdateDescription {
///     values: IndexMap::from([("status".to_string(), json!("closed"))]),
///     remove: vec!["draft_note".to_string()],
///     atomic: vec![update_item::AtomicOperation {
///         property: "revision".to_string(),
///         kind: update_item::AtomicKind::Sum(json!(1)),
///     }],
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateDescription<T> {
    /// Atomic operations evaluated against stored values.
    pub atomic: Vec<AtomicOperation<T>>,
    /// Properties to remove from the item.
    pub remove: Vec<String>,
    /// Plain value assignments, in declaration order.
    pub values: IndexMap<String, T>,
}

impl<T: Serialize> UpdateDescription<T> {
    /// Reject malformed descriptions before anything is built.
    pub(crate) fn validate(&self, key_attributes: &[String]) -> error::Result<()> {
        if self.values.is_empty() && self.remove.is_empty() && self.atomic.is_empty() {
            return Err(error::Error::validation("update changes nothing"));
        }
        let properties = self
            .values
            .keys()
            .chain(self.remove.iter())
            .chain(self.atomic.iter().map(|operation| &operation.property));
        let mut seen = collections::HashSet::new();
        for property in properties {
            if !seen.insert(property.as_str()) {
                return Err(error::Error::Validation(format!(
                    "property `{property}` appears more than once in the update"
                )));
            }
            if key_attributes.contains(property) {
                return Err(error::Error::Validation(format!(
                    "key attribute `{property}` cannot be updated as a data property"
                )));
            }
        }
        Ok(())
    }

    /// Compile the description into one multi-clause update expression.
    ///
    /// Clause order is fixed: SET (assignments, then arithmetic atomics), ADD,
    /// DELETE, REMOVE. Each keyword appears at most once; fragments within a
    /// keyword are comma-joined.
    pub(crate) fn into_fragment(self) -> error::Result<common::ExpressionFragment> {
        let mut set_parts = Vec::new();
        let mut add_parts = Vec::new();
        let mut delete_parts = Vec::new();
        for (property, value) in self.values {
            let name = common::name_placeholder(common::UPDATE_PREFIX, &property);
            let value_placeholder = common::value_placeholder(common::UPDATE_PREFIX, &property);
            set_parts.push(common::ExpressionFragment {
                expression: format!("{name} = {value_placeholder}"),
                names: collections::HashMap::from([(name.clone(), property)]),
                values: collections::HashMap::from([(value_placeholder, to_attribute_value(value)?)]),
            });
        }
        for operation in self.atomic {
            let name = common::name_placeholder(common::UPDATE_PREFIX, &operation.property);
            let value_placeholder =
                common::value_placeholder(common::UPDATE_PREFIX, &operation.property);
            let names = collections::HashMap::from([(name.clone(), operation.property)]);
            let (clause, expression, value) = match operation.kind {
                AtomicKind::Add(value) => (
                    &mut add_parts,
                    format!("{name} {value_placeholder}"),
                    to_attribute_value(value)?,
                ),
                AtomicKind::AddToSet(value) => (
                    &mut add_parts,
                    format!("{name} {value_placeholder}"),
                    to_set_value(value)?,
                ),
                AtomicKind::RemoveFromSet(value) => (
                    &mut delete_parts,
                    format!("{name} {value_placeholder}"),
                    to_set_value(value)?,
                ),
                AtomicKind::SetIfNotExists(value) => (
                    &mut set_parts,
                    format!("{name} = if_not_exists({name}, {value_placeholder})"),
                    to_attribute_value(value)?,
                ),
                AtomicKind::Subtract(value) => (
                    &mut set_parts,
                    format!("{name} = {name} - {value_placeholder}"),
                    to_attribute_value(value)?,
                ),
                AtomicKind::Sum(value) => (
                    &mut set_parts,
                    format!("{name} = {name} + {value_placeholder}"),
                    to_attribute_value(value)?,
                ),
            };
            clause.push(common::ExpressionFragment {
                expression,
                names,
                values: collections::HashMap::from([(value_placeholder, value)]),
            });
        }
        let remove_parts: Vec<_> = self
            .remove
            .into_iter()
            .map(|property| {
                let name = common::name_placeholder(common::UPDATE_PREFIX, &property);
                common::ExpressionFragment {
                    expression: name.clone(),
                    names: collections::HashMap::from([(name, property)]),
                    ..Default::default()
                }
            })
            .collect();
        let mut clauses = Vec::new();
        for (keyword, parts) in [
            ("SET", set_parts),
            ("ADD", add_parts),
            ("DELETE", delete_parts),
            ("REMOVE", remove_parts),
        ] {
            if !parts.is_empty() {
                let mut clause = common::ExpressionFragment::join(", ", parts);
                clause.expression = format!("{keyword} {}", clause.expression);
                clauses.push(clause);
            }
        }
        Ok(common::ExpressionFragment::join(" ", clauses))
    }
}

/// Convert a scalar-or-list value into the store's native set form.
///
/// Strings become a string set, numbers a number set; mixed or non-scalar
/// entries are malformed.
fn to_set_value<T: Serialize>(value: T) -> error::Result<types::AttributeValue> {
    let entries = match to_attribute_value(value)? {
        types::AttributeValue::L(entries) => entries,
        scalar => vec![scalar],
    };
    let mut strings = Vec::new();
    let mut numbers = Vec::new();
    for entry in entries {
        match entry {
            types::AttributeValue::S(text) => strings.push(text),
            types::AttributeValue::N(number) => numbers.push(number),
            _ => {
                return Err(error::Error::validation(
                    "set operations accept only strings and numbers",
                ));
            }
        }
    }
    match (strings.is_empty(), numbers.is_empty()) {
        (false, true) => Ok(types::AttributeValue::Ss(strings)),
        (true, false) => Ok(types::AttributeValue::Ns(numbers)),
        _ => Err(error::Error::validation(
            "set operations need at least one value, all strings or all numbers",
        )),
    }
}

/// Update one item.
///
/// ```rust,no_run
/// use dynamodb_single_table::{common, store, write};
/// use indexmap::IndexMap;
/// use serde_json::json;
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let update_item = write::update_item::UpdateItem {
///     key: common::key::PrimaryKey {
///         partition: common::key::Key {
///             name: "pk".to_string(),
///             value: json!("customer#42"),
///         },
///         ..Default::default()
///     },
///     update: write::update_item::UpdateDescription {
///         values: IndexMap::from([("status".to_string(), json!("closed"))]),
///         ..Default::default()
///     },
///     write_args: write::common::WriteArgs {
///         table_name: "app".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// update_item.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateItem<T> {
    /// The primary key of the item to update.
    pub key: common::key::PrimaryKey<T>,
    /// Which item attributes to return after the update.
    pub return_values: Option<types::ReturnValue>,
    /// What the update changes.
    pub update: UpdateDescription<T>,
    /// Shared write arguments (table name, condition).
    pub write_args: write::common::WriteArgs<T>,
}

impl<T: Serialize> TryFrom<UpdateItem<T>> for store::UpdateRequest {
    type Error = error::Error;

    fn try_from(update_item: UpdateItem<T>) -> error::Result<Self> {
        let mut key_attributes = vec![update_item.key.partition.name.clone()];
        if let Some(range) = &update_item.key.range {
            key_attributes.push(range.name.clone());
        }
        update_item.update.validate(&key_attributes)?;
        let key = update_item.key.try_into()?;
        let mut write_input: write::common::WriteInput = update_item.write_args.try_into()?;
        let update_expression =
            write_input.merge_expression(update_item.update.into_fragment()?);
        Ok(Self {
            condition_expression: write_input.condition_expression,
            expression_attribute_names: write_input.expression_attribute_names,
            expression_attribute_values: write_input.expression_attribute_values,
            key,
            return_values: update_item.return_values,
            table_name: write_input.table_name,
            update_expression,
        })
    }
}

impl<T: Serialize> UpdateItem<T> {
    /// Execute the update, returning the requested attributes.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.update_item", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(
        self,
        store: &S,
    ) -> error::Result<Option<common::Attributes>> {
        let request: store::UpdateRequest = self.try_into()?;
        store.update(request).await
    }
}
