use crate::{error, read, store};

use serde::Serialize;

/// Scan a whole table or index.
///
/// ```rust,no_run
/// use dynamodb_single_table::{read, store};
/// use serde_json::Value;
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let scan: read::scan::Scan<Value> = read::scan::Scan {
///     read_args: read::common::ReadArgs {
///         table_name: "app".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let retrieved = scan.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan<T> {
    /// Shared read arguments (table name, filter, projection, index).
    pub read_args: read::common::ReadArgs<T>,
    /// Stop policy and resume token for the retrieval loop.
    pub retrieval: read::retrieve::Retrieval,
}

/// Compiled scan: the page request plus how to drive it.
#[derive(Clone, Debug, PartialEq)]
struct ScanInput {
    request: store::ScanRequest,
    retrieval: read::retrieve::Retrieval,
}

impl<T: Serialize> TryFrom<Scan<T>> for ScanInput {
    type Error = error::Error;

    fn try_from(scan: Scan<T>) -> error::Result<Self> {
        let read_input: read::common::ReadInput = scan.read_args.try_into()?;
        let request = store::ScanRequest {
            consistent_read: read_input.consistent_read,
            exclusive_start_key: None,
            expression_attribute_names: read_input.expression_attribute_names,
            expression_attribute_values: read_input.expression_attribute_values,
            filter_expression: read_input.filter_expression,
            index_name: read_input.index_name,
            limit: None,
            projection_expression: read_input.projection_expression,
            table_name: read_input.table_name,
        };
        Ok(Self {
            request,
            retrieval: scan.retrieval,
        })
    }
}

impl<T: Serialize> Scan<T> {
    /// Execute the scan, driving pages until the retrieval policy stops.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.scan", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(
        self,
        store: &S,
    ) -> error::Result<read::retrieve::Retrieved> {
        let scan: ScanInput = self.try_into()?;
        read::retrieve::run(
            store,
            read::retrieve::PageRequest::Scan(scan.request),
            scan.retrieval,
        )
        .await
    }
}
