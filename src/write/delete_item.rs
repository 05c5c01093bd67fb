use crate::{common, error, store, write};

use serde::Serialize;

/// Delete one item by primary key.
///
/// ```rust,no_run
/// use dynamodb_single_table::{common, store, write};
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let delete_item = write::delete_item::DeleteItem {
///     key: common::key::PrimaryKey {
///         partition: common::key::Key {
///             name: "pk".to_string(),
///             value: "customer#42".to_string(),
///         },
///         ..Default::default()
///     },
///     write_args: write::common::WriteArgs {
///         table_name: "app".to_string(),
///         ..Default::default()
///     },
/// };
/// delete_item.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteItem<T> {
    /// The primary key of the item to delete.
    pub key: common::key::PrimaryKey<T>,
    /// Shared write arguments (table name, condition).
    pub write_args: write::common::WriteArgs<T>,
}

impl<T: Serialize> TryFrom<DeleteItem<T>> for store::DeleteRequest {
    type Error = error::Error;

    fn try_from(delete_item: DeleteItem<T>) -> error::Result<Self> {
        let key = delete_item.key.try_into()?;
        let write_input: write::common::WriteInput = delete_item.write_args.try_into()?;
        Ok(Self {
            condition_expression: write_input.condition_expression,
            expression_attribute_names: write_input.expression_attribute_names,
            expression_attribute_values: write_input.expression_attribute_values,
            key,
            table_name: write_input.table_name,
        })
    }
}

impl<T: Serialize> DeleteItem<T> {
    /// Execute the delete.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.delete_item", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(self, store: &S) -> error::Result<()> {
        let request: store::DeleteRequest = self.try_into()?;
        store.delete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_sdk_dynamodb::types;
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::collections;

    #[rstest]
    #[case::key_only(
        DeleteItem {
            key: common::key::PrimaryKey {
                partition: common::key::Key {
                    name: "pk".to_string(),
                    value: json!("customer#42"),
                },
                range: Some(
                    common::key::Key {
                        name: "sk".to_string(),
                        value: json!("order#7"),
                    }
                ),
            },
            write_args: write::common::WriteArgs {
                table_name: "app".to_string(),
                ..Default::default()
            },
        },
        store::DeleteRequest {
            key: collections::HashMap::from(
                [
                    (
                        "pk".to_string(),
                        types::AttributeValue::S(
                            "customer#42".to_string()
                        )
                    ),
                    (
                        "sk".to_string(),
                        types::AttributeValue::S(
                            "order#7".to_string()
                        )
                    ),
                ]
            ),
            table_name: "app".to_string(),
            ..Default::default()
        }
    )]
    #[case::guarded(
        DeleteItem {
            key: common::key::PrimaryKey {
                partition: common::key::Key {
                    name: "pk".to_string(),
                    value: json!("customer#42"),
                },
                ..Default::default()
            },
            write_args: write::common::WriteArgs {
                condition: Some(
                    vec![
                        common::condition::ConditionNode::leaf(
                            "status",
                            common::condition::Operation::Equal(
                                json!("closed")
                            )
                        ),
                    ]
                ),
                table_name: "app".to_string(),
            },
        },
        store::DeleteRequest {
            condition_expression: Some(
                "#c_status = :c_status".to_string()
            ),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#c_status".to_string(), "status".to_string()),
                    ]
                )
            ),
            expression_attribute_values: Some(
                collections::HashMap::from(
                    [(
                        ":c_status".to_string(),
                        types::AttributeValue::S(
                            "closed".to_string()
                        ),
                    )]
                )
            ),
            key: collections::HashMap::from(
                [(
                    "pk".to_string(),
                    types::AttributeValue::S(
                        "customer#42".to_string()
                    ),
                )]
            ),
            table_name: "app".to_string(),
        }
    )]
    fn test_delete_item_to_request(
        #[case] delete_item: DeleteItem<Value>,
        #[case] expected: store::DeleteRequest,
    ) {
        let actual: store::DeleteRequest = delete_item.try_into().unwrap();
        assert_eq!(actual, expected);
    }
}
