//! Read operations.
//!
//! This module provides operations for reading data:
//! - Getting individual items by primary key
//! - Querying partitions and scanning tables through the paginated retrieval
//!   engine
//! - Batch retrieving many keys with retry on partial failure

/// Batch get with chunking and retry on unprocessed keys.
pub mod batch_get_item;

/// Common arguments and types shared by read operations.
pub mod common;

/// Get item operation for a single primary key.
pub mod get_item;

/// Query operation over one partition.
pub mod query;

/// The paginated retrieval engine and pagination tokens.
pub mod retrieve;

/// Scan operation over a whole table.
pub mod scan;
