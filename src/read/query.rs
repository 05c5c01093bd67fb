use crate::{common, error, read, store};

use serde::Serialize;

/// Query one partition.
///
/// ```rust,no_run
/// use dynamodb_single_table::{common, read, store};
///
/// # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
/// let query = read::query::Query {
///     partition_key: common::key::Key {
///         name: "pk".to_string(),
///         value: "customer#42".to_string(),
///     },
///     sort_condition: Some(common::condition::SortCondition {
///         name: "sk".to_string(),
///         operation: common::condition::Operation::BeginsWith("order#".to_string()),
///     }),
///     read_args: read::common::ReadArgs {
///         table_name: "app".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let retrieved = query.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query<T> {
    /// The partition key value to query for.
    pub partition_key: common::key::Key<T>,
    /// Shared read arguments (table name, filter, projection, index).
    pub read_args: read::common::ReadArgs<T>,
    /// Stop policy and resume token for the retrieval loop.
    pub retrieval: read::retrieve::Retrieval,
    /// Ascending (`true`, default) or descending range key order.
    pub scan_index_forward: Option<bool>,
    /// Optional condition narrowing the range key window.
    pub sort_condition: Option<common::condition::SortCondition<T>>,
}

/// Compiled query: the page request plus how to drive it.
#[derive(Clone, Debug, PartialEq)]
struct QueryInput {
    request: store::QueryRequest,
    retrieval: read::retrieve::Retrieval,
}

impl<T: Serialize> TryFrom<Query<T>> for QueryInput {
    type Error = error::Error;

    fn try_from(query: Query<T>) -> error::Result<Self> {
        let read_input: read::common::ReadInput = query.read_args.try_into()?;
        let mut expression_attribute_names = read_input.expression_attribute_names;
        let mut expression_attribute_values = read_input.expression_attribute_values;
        let key_fragment =
            common::condition::key_condition_fragment(query.partition_key, query.sort_condition)?;
        let key_condition_expression = key_fragment.merge_into(
            &mut expression_attribute_names,
            &mut expression_attribute_values,
        );
        let request = store::QueryRequest {
            consistent_read: read_input.consistent_read,
            exclusive_start_key: None,
            expression_attribute_names,
            expression_attribute_values,
            filter_expression: read_input.filter_expression,
            index_name: read_input.index_name,
            key_condition_expression,
            limit: None,
            projection_expression: read_input.projection_expression,
            scan_index_forward: query.scan_index_forward,
            table_name: read_input.table_name,
        };
        Ok(Self {
            request,
            retrieval: query.retrieval,
        })
    }
}

impl<T: Serialize> Query<T> {
    /// Execute the query, driving pages until the retrieval policy stops.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.query", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(
        self,
        store: &S,
    ) -> error::Result<read::retrieve::Retrieved> {
        let query: QueryInput = self.try_into()?;
        read::retrieve::run(
            store,
            read::retrieve::PageRequest::Query(query.request),
            query.retrieval,
        )
        .await
    }
}
