#![deny(missing_docs)]

//! # DynamoDB Single Table
//!
//! A type-safe access layer for single-table design on Amazon DynamoDB.
//!
//! ## Overview
//!
//! Single-table design stores many logical entity types in one physical table,
//! distinguished by a type attribute and key-prefixing conventions. This crate
//! covers the client-side plumbing that pattern needs:
//!
//! - Building condition, filter, projection and update expressions with
//!   collision-free placeholder names
//! - Driving paginated query/scan retrieval to a caller-chosen stop condition
//! - Splitting and retrying batch gets around the service's partial failures
//! - Assembling atomic multi-item transactions with local conflict detection
//! - Rebuilding nested parent/child object graphs from one flat partition query
//!
//! All network traffic goes through the [`store::Store`] trait;
//! [`store::DynamoStore`] is the `aws_sdk_dynamodb::Client` implementation.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use dynamodb_single_table::{common, read, store};
//!
//! # async fn example(store: &store::DynamoStore) -> Result<(), dynamodb_single_table::error::Error> {
//! // Fetch one partition in full, however many pages it takes.
//! let query = read::query::Query {
//!     partition_key: common::key::Key {
//!         name: "pk".to_string(),
//!         value: "customer#42".to_string(),
//!     },
//!     read_args: read::common::ReadArgs {
//!         table_name: "app".to_string(),
//!         ..Default::default()
//!     },
//!     retrieval: read::retrieve::Retrieval {
//!         policy: read::retrieve::RetrievalPolicy::Full,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! let retrieved = query.send(store).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Keys, condition trees, projections, expression fragments
//! - [`mod@store`] - The abstract store collaborator and its DynamoDB implementation
//! - [`mod@read`] - Retrieval: get, query, scan, paginated retrieval, batch get
//! - [`mod@write`] - Mutation: put, update, delete, transactions
//! - [`mod@join`] - Client-side collection joins over flat partition results
//! - [`mod@error`] - The crate error taxonomy

/// Shared utilities: keys, condition trees, projections, expression fragments.
pub mod common;

/// Error taxonomy for the whole crate.
pub mod error;

/// Collection joins: nested object graphs from flat partition queries.
pub mod join;

/// Read operations for retrieving data.
///
/// This module provides operations for:
/// - Getting individual items by primary key
/// - Querying partitions and scanning tables with pagination policies
/// - Batch retrieving many keys with retry on partial failure
pub mod read;

/// The abstract store collaborator and its DynamoDB implementation.
pub mod store;

/// Write operations for modifying data.
///
/// This module provides operations for:
/// - Putting new items or replacing existing ones
/// - Updating items with value, atomic, and remove operations
/// - Deleting items by key
/// - Atomic multi-item transactions
pub mod write;
