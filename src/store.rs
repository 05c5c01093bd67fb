//! The abstract store collaborator.
//!
//! Every operation in this crate compiles down to one of the flat request
//! structs here and hands it to a [`Store`]. The trait carries no transport or
//! auth detail; [`DynamoStore`] is the production implementation over
//! `aws_sdk_dynamodb::Client`, and tests script fakes against the same seam.

use crate::{common, error};

use aws_sdk_dynamodb::{Client, types};
use std::collections;

/// A single-item read request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetRequest {
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Attribute-name placeholder map for the projection expression.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// The primary key of the item to read.
    pub key: common::Attributes,
    /// Which attributes to return.
    pub projection_expression: Option<String>,
    /// The table to read from.
    pub table_name: String,
}

/// A single-item put request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutRequest {
    /// Condition that must hold for the put to succeed.
    pub condition_expression: Option<String>,
    /// Attribute-name placeholder map for the condition expression.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attribute-value placeholder map for the condition expression.
    pub expression_attribute_values: Option<common::Attributes>,
    /// The full item to store.
    pub item: common::Attributes,
    /// The table to write to.
    pub table_name: String,
}

/// A single-item update request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateRequest {
    /// Condition that must hold for the update to succeed.
    pub condition_expression: Option<String>,
    /// Attribute-name placeholder map shared by both expressions.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attribute-value placeholder map shared by both expressions.
    pub expression_attribute_values: Option<common::Attributes>,
    /// The primary key of the item to update.
    pub key: common::Attributes,
    /// Which item attributes to return after the update.
    pub return_values: Option<types::ReturnValue>,
    /// The table to write to.
    pub table_name: String,
    /// The update expression to apply.
    pub update_expression: String,
}

/// A single-item delete request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteRequest {
    /// Condition that must hold for the delete to succeed.
    pub condition_expression: Option<String>,
    /// Attribute-name placeholder map for the condition expression.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attribute-value placeholder map for the condition expression.
    pub expression_attribute_values: Option<common::Attributes>,
    /// The primary key of the item to delete.
    pub key: common::Attributes,
    /// The table to write to.
    pub table_name: String,
}

/// One page request against a partition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRequest {
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Resume point from a previous page.
    pub exclusive_start_key: Option<common::Attributes>,
    /// Attribute-name placeholder map shared by all expressions.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attribute-value placeholder map shared by all expressions.
    pub expression_attribute_values: Option<common::Attributes>,
    /// Filter applied server-side after the key condition.
    pub filter_expression: Option<String>,
    /// Secondary index to query instead of the base table.
    pub index_name: Option<String>,
    /// The key condition selecting the partition (and range window).
    pub key_condition_expression: String,
    /// Maximum number of items to evaluate in this page.
    pub limit: Option<i32>,
    /// Which attributes to return.
    pub projection_expression: Option<String>,
    /// Ascending (`true`, default) or descending range key order.
    pub scan_index_forward: Option<bool>,
    /// The table to read from.
    pub table_name: String,
}

/// One page request against a whole table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanRequest {
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Resume point from a previous page.
    pub exclusive_start_key: Option<common::Attributes>,
    /// Attribute-name placeholder map shared by all expressions.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attribute-value placeholder map shared by all expressions.
    pub expression_attribute_values: Option<common::Attributes>,
    /// Filter applied server-side to every scanned item.
    pub filter_expression: Option<String>,
    /// Secondary index to scan instead of the base table.
    pub index_name: Option<String>,
    /// Maximum number of items to evaluate in this page.
    pub limit: Option<i32>,
    /// Which attributes to return.
    pub projection_expression: Option<String>,
    /// The table to read from.
    pub table_name: String,
}

/// One batch-get call for a chunk of keys against one table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetRequest {
    /// Whether to use strongly consistent reads.
    pub consistent_read: Option<bool>,
    /// The primary keys to fetch, at most the store's per-call maximum.
    pub keys: Vec<common::Attributes>,
    /// The table to read from.
    pub table_name: String,
}

/// One operation inside an atomic transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactWriteOp {
    /// Assert a condition against an item without writing it.
    Check {
        /// Condition that must hold for the transaction to commit.
        condition_expression: String,
        /// Attribute-name placeholder map for the condition.
        expression_attribute_names: Option<collections::HashMap<String, String>>,
        /// Attribute-value placeholder map for the condition.
        expression_attribute_values: Option<common::Attributes>,
        /// The primary key of the item to check.
        key: common::Attributes,
        /// The table holding the item.
        table_name: String,
    },
    /// Delete an item.
    Delete {
        /// Condition that must hold for the delete to commit.
        condition_expression: Option<String>,
        /// Attribute-name placeholder map for the condition.
        expression_attribute_names: Option<collections::HashMap<String, String>>,
        /// Attribute-value placeholder map for the condition.
        expression_attribute_values: Option<common::Attributes>,
        /// The primary key of the item to delete.
        key: common::Attributes,
        /// The table holding the item.
        table_name: String,
    },
    /// Put a full item.
    Put {
        /// Condition that must hold for the put to commit.
        condition_expression: Option<String>,
        /// Attribute-name placeholder map for the condition.
        expression_attribute_names: Option<collections::HashMap<String, String>>,
        /// Attribute-value placeholder map for the condition.
        expression_attribute_values: Option<common::Attributes>,
        /// The full item to store.
        item: common::Attributes,
        /// The table to write to.
        table_name: String,
    },
    /// Apply an update expression to an item.
    Update {
        /// Condition that must hold for the update to commit.
        condition_expression: Option<String>,
        /// Attribute-name placeholder map shared by both expressions.
        expression_attribute_names: Option<collections::HashMap<String, String>>,
        /// Attribute-value placeholder map shared by both expressions.
        expression_attribute_values: Option<common::Attributes>,
        /// The primary key of the item to update.
        key: common::Attributes,
        /// The table holding the item.
        table_name: String,
        /// The update expression to apply.
        update_expression: String,
    },
}

impl TransactWriteOp {
    /// The attributes identifying the item this operation touches.
    ///
    /// For puts this is the full item, which contains the key attributes.
    pub(crate) fn item_attributes(&self) -> &common::Attributes {
        match self {
            Self::Check { key, .. } => key,
            Self::Delete { key, .. } => key,
            Self::Put { item, .. } => item,
            Self::Update { key, .. } => key,
        }
    }
}

/// One page of a query or scan result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The items in this page.
    pub items: Vec<common::Attributes>,
    /// The resume point for the next page, absent at the natural end.
    pub last_evaluated_key: Option<common::Attributes>,
}

/// The result of one batch-get call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchPage {
    /// The items the store returned.
    pub items: Vec<common::Attributes>,
    /// Keys the store did not process in this call.
    pub unprocessed_keys: Vec<common::Attributes>,
}

/// The store collaborator every operation dispatches through.
///
/// Implementations execute requests; they never decide how to recurse, retry
/// or assemble around them - that is this crate's job.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Read one item by primary key.
    async fn get(&self, request: GetRequest) -> error::Result<Option<common::Attributes>>;

    /// Store one full item.
    async fn put(&self, request: PutRequest) -> error::Result<()>;

    /// Apply an update expression to one item, returning the requested
    /// attributes.
    async fn update(&self, request: UpdateRequest) -> error::Result<Option<common::Attributes>>;

    /// Delete one item by primary key.
    async fn delete(&self, request: DeleteRequest) -> error::Result<()>;

    /// Fetch one page of a partition query.
    async fn query(&self, request: QueryRequest) -> error::Result<Page>;

    /// Fetch one page of a table scan.
    async fn scan(&self, request: ScanRequest) -> error::Result<Page>;

    /// Fetch one chunk of keys in a single call.
    async fn batch_get(&self, request: BatchGetRequest) -> error::Result<BatchPage>;

    /// Execute a set of operations as one atomic transaction.
    async fn transact_write(&self, operations: Vec<TransactWriteOp>) -> error::Result<()>;
}

/// The production [`Store`] over `aws_sdk_dynamodb::Client`.
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Wrap a configured DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Store for DynamoStore {
    async fn get(&self, request: GetRequest) -> error::Result<Option<common::Attributes>> {
        let output = self
            .client
            .get_item()
            .set_consistent_read(request.consistent_read)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_key(Some(request.key))
            .set_projection_expression(request.projection_expression)
            .table_name(request.table_name)
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(output.item)
    }

    async fn put(&self, request: PutRequest) -> error::Result<()> {
        self.client
            .put_item()
            .set_condition_expression(request.condition_expression)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_item(Some(request.item))
            .table_name(request.table_name)
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(())
    }

    async fn update(&self, request: UpdateRequest) -> error::Result<Option<common::Attributes>> {
        let output = self
            .client
            .update_item()
            .set_condition_expression(request.condition_expression)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_key(Some(request.key))
            .set_return_values(request.return_values)
            .table_name(request.table_name)
            .update_expression(request.update_expression)
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(output.attributes)
    }

    async fn delete(&self, request: DeleteRequest) -> error::Result<()> {
        self.client
            .delete_item()
            .set_condition_expression(request.condition_expression)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_key(Some(request.key))
            .table_name(request.table_name)
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> error::Result<Page> {
        let output = self
            .client
            .query()
            .set_consistent_read(request.consistent_read)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_filter_expression(request.filter_expression)
            .set_index_name(request.index_name)
            .key_condition_expression(request.key_condition_expression)
            .set_limit(request.limit)
            .set_projection_expression(request.projection_expression)
            .set_scan_index_forward(request.scan_index_forward)
            .table_name(request.table_name)
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(Page {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
        })
    }

    async fn scan(&self, request: ScanRequest) -> error::Result<Page> {
        let output = self
            .client
            .scan()
            .set_consistent_read(request.consistent_read)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_filter_expression(request.filter_expression)
            .set_index_name(request.index_name)
            .set_limit(request.limit)
            .set_projection_expression(request.projection_expression)
            .table_name(request.table_name)
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(Page {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
        })
    }

    async fn batch_get(&self, request: BatchGetRequest) -> error::Result<BatchPage> {
        let keys_and_attributes = types::KeysAndAttributes::builder()
            .set_consistent_read(request.consistent_read)
            .set_keys(Some(request.keys))
            .build()
            .map_err(error::Error::store)?;
        let output = self
            .client
            .batch_get_item()
            .request_items(request.table_name.clone(), keys_and_attributes)
            .send()
            .await
            .map_err(error::Error::store)?;
        let items = output
            .responses
            .unwrap_or_default()
            .remove(&request.table_name)
            .unwrap_or_default();
        let unprocessed_keys = output
            .unprocessed_keys
            .unwrap_or_default()
            .remove(&request.table_name)
            .map(|keys_and_attributes| keys_and_attributes.keys)
            .unwrap_or_default();
        Ok(BatchPage {
            items,
            unprocessed_keys,
        })
    }

    async fn transact_write(&self, operations: Vec<TransactWriteOp>) -> error::Result<()> {
        let mut items = Vec::with_capacity(operations.len());
        for operation in operations {
            items.push(to_transact_item(operation)?);
        }
        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(error::Error::store)?;
        Ok(())
    }
}

fn to_transact_item(operation: TransactWriteOp) -> error::Result<types::TransactWriteItem> {
    let builder = types::TransactWriteItem::builder();
    let item = match operation {
        TransactWriteOp::Check {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            key,
            table_name,
        } => {
            let check = types::ConditionCheck::builder()
                .condition_expression(condition_expression)
                .set_expression_attribute_names(expression_attribute_names)
                .set_expression_attribute_values(expression_attribute_values)
                .set_key(Some(key))
                .table_name(table_name)
                .build()
                .map_err(error::Error::store)?;
            builder.condition_check(check)
        }
        TransactWriteOp::Delete {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            key,
            table_name,
        } => {
            let delete = types::Delete::builder()
                .set_condition_expression(condition_expression)
                .set_expression_attribute_names(expression_attribute_names)
                .set_expression_attribute_values(expression_attribute_values)
                .set_key(Some(key))
                .table_name(table_name)
                .build()
                .map_err(error::Error::store)?;
            builder.delete(delete)
        }
        TransactWriteOp::Put {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            item,
            table_name,
        } => {
            let put = types::Put::builder()
                .set_condition_expression(condition_expression)
                .set_expression_attribute_names(expression_attribute_names)
                .set_expression_attribute_values(expression_attribute_values)
                .set_item(Some(item))
                .table_name(table_name)
                .build()
                .map_err(error::Error::store)?;
            builder.put(put)
        }
        TransactWriteOp::Update {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            key,
            table_name,
            update_expression,
        } => {
            let update = types::Update::builder()
                .set_condition_expression(condition_expression)
                .set_expression_attribute_names(expression_attribute_names)
                .set_expression_attribute_values(expression_attribute_values)
                .set_key(Some(key))
                .table_name(table_name)
                .update_expression(update_expression)
                .build()
                .map_err(error::Error::store)?;
            builder.update(update)
        }
    };
    Ok(item.build())
}
