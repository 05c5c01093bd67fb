use crate::{common, error, store};

use serde::Serialize;

/// Read one item by primary key.
///
/// ```rust,no_run
/// use dynamodb_single_table::{common, read, store};
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let get_item = read::get_item::GetItem {
///     key: common::key::PrimaryKey {
///         partition: common::key::Key {
///             name: "pk".to_string(),
///             value: "customer#42".to_string(),
///         },
///         ..Default::default()
///     },
///     table_name: "app".to_string(),
///     ..Default::default()
/// };
/// let item = get_item.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItem<T> {
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// The primary key of the item to retrieve.
    pub key: common::key::PrimaryKey<T>,
    /// Which attributes to return.
    pub projection: Option<common::projection::Projection>,
    /// The table to read from.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<GetItem<T>> for store::GetRequest {
    type Error = error::Error;

    fn try_from(get_item: GetItem<T>) -> error::Result<Self> {
        let key = get_item.key.try_into()?;
        let mut expression_attribute_names = None;
        let projection_expression = get_item.projection.map(|projection| {
            let mut values = None;
            projection
                .into_fragment(common::PROJECTION_PREFIX)
                .merge_into(&mut expression_attribute_names, &mut values)
        });
        Ok(Self {
            consistent_read: get_item.consistent_read,
            expression_attribute_names,
            key,
            projection_expression,
            table_name: get_item.table_name,
        })
    }
}

impl<T: Serialize> GetItem<T> {
    /// Execute the get, returning the item when it exists.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.get_item", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(
        self,
        store: &S,
    ) -> error::Result<Option<common::Attributes>> {
        let request: store::GetRequest = self.try_into()?;
        store.get(request).await
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
        GetItem {
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
            table_name: "app".to_string(),
            ..Default::default()
        },
        store::GetRequest {
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
    #[case::with_projection(
        GetItem {
            consistent_read: Some(true),
            key: common::key::PrimaryKey {
                partition: common::key::Key {
                    name: "pk".to_string(),
                    value: json!("customer#42"),
                },
                ..Default::default()
            },
            projection: Some(
                common::projection::Projection::Attributes(
                    vec![
                        "status".to_string(),
                        "total".to_string(),
                    ]
                )
            ),
            table_name: "app".to_string(),
        },
        store::GetRequest {
            consistent_read: Some(true),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#p_status".to_string(), "status".to_string()),
                        ("#p_total".to_string(), "total".to_string()),
                    ]
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
            projection_expression: Some(
                "#p_status, #p_total".to_string()
            ),
            table_name: "app".to_string(),
        }
    )]
    fn test_get_item_to_request(#[case] get_item: GetItem<Value>, #[case] expected: store::GetRequest) {
        let actual: store::GetRequest = get_item.try_into().unwrap();
        assert_eq!(actual, expected);
    }
}
