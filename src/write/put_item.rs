use crate::{error, store, write};

use serde::Serialize;
use serde_dynamo::to_item;

/// Put one full item, creating or replacing it.
///
/// ```rust,no_run
/// use dynamodb_single_table::{store, write};
/// use serde_json::json;
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let put_item = write::put_item::PutItem {
///     item: json!({"pk": "customer#42", "sk": "order#7", "_et": "order"}),
///     write_args: write::common::WriteArgs {
///         table_name: "app".to_string(),
///         ..Default::default()
///     },
/// };
/// put_item.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutItem<T> {
    /// The full item to store.
    pub item: T,
    /// Shared write arguments (table name, condition).
    pub write_args: write::common::WriteArgs<T>,
}

impl<T: Serialize> TryFrom<PutItem<T>> for store::PutRequest {
    type Error = error::Error;

    fn try_from(put_item: PutItem<T>) -> error::Result<Self> {
        let item = to_item(put_item.item)?;
        let write_input: write::common::WriteInput = put_item.write_args.try_into()?;
        Ok(Self {
            condition_expression: write_input.condition_expression,
            expression_attribute_names: write_input.expression_attribute_names,
            expression_attribute_values: write_input.expression_attribute_values,
            item,
            table_name: write_input.table_name,
        })
    }
}

impl<T: Serialize> PutItem<T> {
    /// Execute the put.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.put_item", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(self, store: &S) -> error::Result<()> {
        let request: store::PutRequest = self.try_into()?;
        store.put(request).await
    }
}
