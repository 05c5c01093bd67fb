//! Error taxonomy.
//!
//! Validation, conflict and limit errors are raised locally, before any
//! network call, and never leave partial state behind. Store errors are an
//! opaque passthrough from the underlying client and are not interpreted.

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request composition, detected before any request is sent.
    #[error("invalid request parameters: {0}")]
    Validation(String),

    /// Two operations in one transaction target the same item.
    #[error("conflicting operations on item `{0}` within one transaction")]
    Conflict(String),

    /// A transaction holds more operations than the store accepts per call.
    #[error("transaction holds {0} operations, more than the store accepts per call")]
    LimitExceeded(usize),

    /// A value could not be converted to or from the store's attribute form.
    #[error("attribute serialization failed")]
    Serialization(#[from] serde_dynamo::Error),

    /// A pagination token could not be decoded back into a key.
    #[error("malformed pagination token: {0}")]
    Token(String),

    /// Keys left unprocessed after batch retries were exhausted.
    ///
    /// Only raised when the caller opted into failing on leftovers; the
    /// default is to degrade to a partial result.
    #[error("{0} keys left unprocessed after batch retries were exhausted")]
    Unprocessed(usize),

    /// Opaque failure reported by the underlying store.
    #[error("store request failed")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn store(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(source))
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
