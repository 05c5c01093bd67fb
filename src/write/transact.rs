//! Atomic multi-item transactions.
//!
//! Heterogeneous operations are assembled into one `transact_write` call.
//! Conflicts are rejected locally before dispatch: the underlying store does
//! not support two operations against the same item in one transaction, and a
//! fast local failure beats an ambiguous remote one. Store rejection fails the
//! whole transaction; the store's own atomicity makes partial retry
//! meaningless, so none is attempted.

use crate::{common, error, store, write};

use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Maximum number of operations the store accepts in one transaction.
pub const MAX_TRANSACTION_OPERATIONS: usize = 99;

/// Create an item inside a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateOperation<T> {
    /// The full item to store.
    pub item: T,
    /// Shared write arguments (table name, condition).
    pub write_args: write::common::WriteArgs<T>,
}

/// Update an item inside a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchOperation<T> {
    /// The primary key of the item to update.
    pub key: common::key::PrimaryKey<T>,
    /// What the update changes.
    pub update: write::update_item::UpdateDescription<T>,
    /// Shared write arguments (table name, condition).
    pub write_args: write::common::WriteArgs<T>,
}

/// Delete an item inside a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct EraseOperation<T> {
    /// The primary key of the item to delete.
    pub key: common::key::PrimaryKey<T>,
    /// Shared write arguments (table name, condition).
    pub write_args: write::common::WriteArgs<T>,
}

/// Assert a condition against an item without writing it.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckOperation<T> {
    /// The condition that must hold for the transaction to commit.
    pub condition: Vec<common::condition::ConditionNode<T>>,
    /// The primary key of the item to check.
    pub key: common::key::PrimaryKey<T>,
    /// The table holding the item.
    pub table_name: String,
}

/// One operation of a transaction, exactly one payload per case.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionOperation<T> {
    /// Assert a condition without writing.
    Check(CheckOperation<T>),
    /// Create or replace an item.
    Create(CreateOperation<T>),
    /// Delete an item.
    Erase(EraseOperation<T>),
    /// Update an item.
    Patch(PatchOperation<T>),
}

impl<T: Serialize> TryFrom<TransactionOperation<T>> for store::TransactWriteOp {
    type Error = error::Error;

    fn try_from(operation: TransactionOperation<T>) -> error::Result<Self> {
        match operation {
            TransactionOperation::Check(check) => {
                if check.condition.is_empty() {
                    return Err(error::Error::validation(
                        "check operation requires a condition",
                    ));
                }
                let mut expression_attribute_names = None;
                let mut expression_attribute_values = None;
                let condition_expression = common::condition::build_expression(
                    check.condition,
                    common::CONDITION_PREFIX,
                )?
                .merge_into(
                    &mut expression_attribute_names,
                    &mut expression_attribute_values,
                );
                Ok(Self::Check {
                    condition_expression,
                    expression_attribute_names,
                    expression_attribute_values,
                    key: check.key.try_into()?,
                    table_name: check.table_name,
                })
            }
            TransactionOperation::Create(create) => {
                let item = to_item(create.item)?;
                let write_input: write::common::WriteInput = create.write_args.try_into()?;
                Ok(Self::Put {
                    condition_expression: write_input.condition_expression,
                    expression_attribute_names: write_input.expression_attribute_names,
                    expression_attribute_values: write_input.expression_attribute_values,
                    item,
                    table_name: write_input.table_name,
                })
            }
            TransactionOperation::Erase(erase) => {
                let key = erase.key.try_into()?;
                let write_input: write::common::WriteInput = erase.write_args.try_into()?;
                Ok(Self::Delete {
                    condition_expression: write_input.condition_expression,
                    expression_attribute_names: write_input.expression_attribute_names,
                    expression_attribute_values: write_input.expression_attribute_values,
                    key,
                    table_name: write_input.table_name,
                })
            }
            TransactionOperation::Patch(patch) => {
                let mut key_attributes = vec![patch.key.partition.name.clone()];
                if let Some(range) = &patch.key.range {
                    key_attributes.push(range.name.clone());
                }
                patch.update.validate(&key_attributes)?;
                let key = patch.key.try_into()?;
                let mut write_input: write::common::WriteInput = patch.write_args.try_into()?;
                let update_expression =
                    write_input.merge_expression(patch.update.into_fragment()?);
                Ok(Self::Update {
                    condition_expression: write_input.condition_expression,
                    expression_attribute_names: write_input.expression_attribute_names,
                    expression_attribute_values: write_input.expression_attribute_values,
                    key,
                    table_name: write_input.table_name,
                    update_expression,
                })
            }
        }
    }
}

/// An atomic batch of heterogeneous operations.
///
/// `None` entries are dropped before anything else, so callers can assemble
/// the list conditionally without reshaping it.
///
/// ```rust,no_run
/// use dynamodb_single_table::{common, store, write};
/// use serde_json::json;
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let transaction = write::transact::Transaction {
///     operations: vec![
///         Some(write::transact::TransactionOperation::Create(
///             write::transact::CreateOperation {
///                 item: json!({"pk": "customer#42", "sk": "order#7", "_et": "order"}),
///                 write_args: write::common::WriteArgs {
///                     table_name: "app".to_string(),
///                     ..Default::default()
///                 },
///             },
///         )),
///         None,
///     ],
///     ..Default::default()
/// };
/// transaction.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction<T> {
    /// The table layout used to identify the item each operation touches.
    pub layout: common::key::TableLayout,
    /// The operations to commit atomically; `None` entries are skipped.
    pub operations: Vec<Option<TransactionOperation<T>>>,
}

impl<T: Serialize> Transaction<T> {
    /// Validate the batch and submit it as one atomic call.
    ///
    /// Fails locally with [`error::Error::Conflict`] when two operations
    /// resolve to the same item, and with [`error::Error::LimitExceeded`] when
    /// the batch is over the store maximum; nothing is dispatched in either
    /// case.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.transact", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(self, store: &S) -> error::Result<()> {
        let operations: Vec<_> = self.operations.into_iter().flatten().collect();
        if operations.len() > MAX_TRANSACTION_OPERATIONS {
            return Err(error::Error::LimitExceeded(operations.len()));
        }
        let mut ops: Vec<store::TransactWriteOp> = Vec::with_capacity(operations.len());
        for operation in operations {
            ops.push(operation.try_into()?);
        }
        let mut seen = collections::HashSet::with_capacity(ops.len());
        for op in &ops {
            let canonical = canonical_key(&self.layout, op.item_attributes());
            if !seen.insert(canonical.clone()) {
                return Err(error::Error::Conflict(canonical));
            }
        }
        store.transact_write(ops).await
    }
}

/// One stable string per item: `<partition>--<range>`.
///
/// For puts the key attributes are read out of the full item, so a create and
/// an update of the same item collide as they should.
fn canonical_key(layout: &common::key::TableLayout, attributes: &common::Attributes) -> String {
    let partition = attribute_text(attributes.get(&layout.partition_attribute));
    let range = attribute_text(attributes.get(&layout.range_attribute));
    format!("{partition}--{range}")
}

fn attribute_text(value: Option<&aws_sdk_dynamodb::types::AttributeValue>) -> String {
    use aws_sdk_dynamodb::types::AttributeValue;
    match value {
        Some(AttributeValue::S(text)) => text.clone(),
        Some(AttributeValue::N(number)) => number.clone(),
        Some(AttributeValue::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeStore;

    use indexmap::IndexMap;
    use serde_json::{Value, json};

    fn key(partition: &str, range: &str) -> common::key::PrimaryKey<Value> {
        common::key::PrimaryKey {
            partition: common::key::Key {
                name: "pk".to_string(),
                value: json!(partition),
            },
            range: Some(common::key::Key {
                name: "sk".to_string(),
                value: json!(range),
            }),
        }
    }

    fn erase(partition: &str, range: &str) -> TransactionOperation<Value> {
        TransactionOperation::Erase(EraseOperation {
            key: key(partition, range),
            write_args: write::common::WriteArgs {
                table_name: "app".to_string(),
                ..Default::default()
            },
        })
    }

    fn patch(partition: &str, range: &str) -> TransactionOperation<Value> {
        TransactionOperation::Patch(PatchOperation {
            key: key(partition, range),
            update: write::update_item::UpdateDescription {
                values: IndexMap::from([("status".to_string(), json!("closed"))]),
                ..Default::default()
            },
            write_args: write::common::WriteArgs {
                table_name: "app".to_string(),
                ..Default::default()
            },
        })
    }

    #[tokio::test]
    async fn test_same_key_operations_are_rejected_before_dispatch() {
        let store = FakeStore::default();
        let transaction = Transaction {
            operations: vec![Some(patch("A", "B")), Some(erase("A", "B"))],
            ..Default::default()
        };
        let result = transaction.send(&store).await;
        match result {
            Err(error::Error::Conflict(canonical)) => assert_eq!(canonical, "A--B"),
            other => panic!("expected a conflict, got {other:?}"),
        }
        assert!(store.transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_conflicts_with_update_of_the_same_item() {
        let store = FakeStore::default();
        let create = TransactionOperation::Create(CreateOperation {
            item: json!({"pk": "A", "sk": "B", "_et": "order"}),
            write_args: write::common::WriteArgs {
                table_name: "app".to_string(),
                ..Default::default()
            },
        });
        let transaction = Transaction {
            operations: vec![Some(create), Some(patch("A", "B"))],
            ..Default::default()
        };
        assert!(matches!(
            transaction.send(&store).await,
            Err(error::Error::Conflict(_))
        ));
        assert!(store.transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected_before_dispatch() {
        let store = FakeStore::default();
        let operations: Vec<_> = (0..MAX_TRANSACTION_OPERATIONS + 1)
            .map(|position| Some(erase("A", &position.to_string())))
            .collect();
        let transaction = Transaction {
            operations,
            ..Default::default()
        };
        assert!(matches!(
            transaction.send(&store).await,
            Err(error::Error::LimitExceeded(100))
        ));
        assert!(store.transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_entries_are_dropped_and_the_rest_dispatched() {
        let store = FakeStore::default();
        let transaction = Transaction {
            operations: vec![None, Some(erase("A", "B")), None, Some(patch("A", "C"))],
            ..Default::default()
        };
        transaction.send(&store).await.unwrap();
        let transactions = store.transactions.lock().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].len(), 2);
        assert!(matches!(
            transactions[0][0],
            store::TransactWriteOp::Delete { .. }
        ));
        assert!(matches!(
            transactions[0][1],
            store::TransactWriteOp::Update { .. }
        ));
    }

    #[tokio::test]
    async fn test_operation_mapping_carries_expressions() {
        let store = FakeStore::default();
        let check = TransactionOperation::Check(CheckOperation {
            condition: vec![common::condition::ConditionNode::leaf(
                "status",
                common::condition::Operation::Equal(json!("open")),
            )],
            key: key("A", "B"),
            table_name: "app".to_string(),
        });
        let transaction = Transaction {
            operations: vec![Some(check), Some(patch("A", "C"))],
            ..Default::default()
        };
        transaction.send(&store).await.unwrap();
        let transactions = store.transactions.lock().unwrap();
        match &transactions[0][0] {
            store::TransactWriteOp::Check {
                condition_expression,
                table_name,
                ..
            } => {
                assert_eq!(condition_expression, "#c_status = :c_status");
                assert_eq!(table_name, "app");
            }
            other => panic!("expected a check, got {other:?}"),
        }
        match &transactions[0][1] {
            store::TransactWriteOp::Update {
                update_expression, ..
            } => {
                assert_eq!(update_expression, "SET #u_status = :u_status");
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_check_condition_is_rejected() {
        let store = FakeStore::default();
        let check = TransactionOperation::Check(CheckOperation::<Value> {
            condition: vec![],
            key: key("A", "B"),
            table_name: "app".to_string(),
        });
        let transaction = Transaction {
            operations: vec![Some(check)],
            ..Default::default()
        };
        assert!(matches!(
            transaction.send(&store).await,
            Err(error::Error::Validation(_))
        ));
    }
}
