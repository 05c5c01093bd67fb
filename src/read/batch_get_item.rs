//! Batch get with chunking and retry.
//!
//! The store accepts at most [`MAX_BATCH_KEYS`] keys per call and may return
//! any subset of them unprocessed. The coordinator splits the requested keys
//! into chunks, fetches the chunks concurrently, and retries each chunk's
//! unprocessed keys independently with exponential backoff. Chunks never
//! coordinate: each owns its retry counter and backoff timer, and retries
//! within one chunk are strictly sequential.

use crate::{common, error, store};

use futures::future;
use serde::Serialize;
use std::time::Duration;

/// Maximum number of keys the store accepts in one batch-get call.
pub const MAX_BATCH_KEYS: usize = 100;

const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Per-chunk retry behavior for unprocessed keys.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// How many retries a chunk gets after its initial call.
    pub max_retries: u32,
    /// Backoff before retry `n` is `base_delay * 2^n`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Fetch many items by primary key.
///
/// Returned items are concatenated in chunk-submission order; within a chunk
/// they arrive in whatever order the store returned them, which is not the
/// request order - re-key on the caller side when a stable mapping matters.
///
/// ```rust,no_run
/// use dynamodb_single_table::{common, read, store};
/// use serde_json::Value;
///
/// # async fn example(store: &store::DynamoStore, keys: Vec<common::key::PrimaryKey<Value>>) -> Result<(), dynamodb_single_table::error::Error> {
/// let batch_get = read::batch_get_item::BatchGetItem {
///     keys,
///     table_name: "app".to_string(),
///     ..Default::default()
/// };
/// let items = batch_get.send(store).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetItem<T> {
    /// Whether to use strongly consistent reads.
    pub consistent_read: Option<bool>,
    /// Error instead of returning a partial result when retries are exhausted
    /// with keys still unprocessed.
    pub fail_on_unprocessed: bool,
    /// The primary keys to fetch.
    pub keys: Vec<common::key::PrimaryKey<T>>,
    /// Per-chunk retry behavior.
    pub retry: RetryConfig,
    /// The table to read from.
    pub table_name: String,
}

impl<T: Serialize> BatchGetItem<T> {
    /// Fetch every requested key, chunking and retrying as needed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "single_table.batch_get_item", err, skip(self, store))
    )]
    pub async fn send<S: store::Store>(self, store: &S) -> error::Result<Vec<common::Attributes>> {
        let mut serialized_keys = Vec::with_capacity(self.keys.len());
        for key in self.keys {
            serialized_keys.push(key.try_into()?);
        }
        let fetches: Vec<_> = serialized_keys
            .chunks(MAX_BATCH_KEYS)
            .map(|chunk| {
                fetch_chunk(
                    store,
                    &self.table_name,
                    chunk.to_vec(),
                    self.consistent_read,
                    &self.retry,
                    self.fail_on_unprocessed,
                )
            })
            .collect();
        let chunk_results = future::try_join_all(fetches).await?;
        Ok(chunk_results.into_iter().flatten().collect())
    }
}

/// Fetch one chunk, retrying its unprocessed keys until none remain or the
/// retry budget runs out.
async fn fetch_chunk<S: store::Store>(
    store: &S,
    table_name: &str,
    mut keys: Vec<common::Attributes>,
    consistent_read: Option<bool>,
    retry: &RetryConfig,
    fail_on_unprocessed: bool,
) -> error::Result<Vec<common::Attributes>> {
    let mut items = Vec::with_capacity(keys.len());
    let mut attempt = 0;
    loop {
        let request = store::BatchGetRequest {
            consistent_read,
            keys,
            table_name: table_name.to_string(),
        };
        let page = store.batch_get(request).await?;
        items.extend(page.items);
        if page.unprocessed_keys.is_empty() {
            return Ok(items);
        }
        if attempt >= retry.max_retries {
            if fail_on_unprocessed {
                return Err(error::Error::Unprocessed(page.unprocessed_keys.len()));
            }
            return Ok(items);
        }
        // dropping the future cancels this wait along with the whole call
        tokio::time::sleep(retry.base_delay * 2u32.pow(attempt)).await;
        keys = page.unprocessed_keys;
        attempt += 1;
    }
}
