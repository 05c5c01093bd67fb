//! Write operations.
//!
//! This module provides operations for modifying data:
//! - Putting new items or replacing existing ones
//! - Updating items with value, atomic, and remove operations
//! - Deleting items by key
//! - Batching heterogeneous operations into one atomic transaction

/// Common arguments and types shared by write operations.
pub mod common;

/// Delete item operation.
pub mod delete_item;

/// Put item operation.
pub mod put_item;

/// Atomic multi-item transactions with local conflict detection.
pub mod transact;

/// Update item operation and the update expression compiler.
pub mod update_item;
