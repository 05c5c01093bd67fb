//! The paginated retrieval engine.
//!
//! Query and scan results arrive in pages. The engine issues page requests in
//! an explicit loop - an accumulator, never recursion, so call depth stays
//! flat on arbitrarily large partitions - until the caller's stop condition is
//! met, and threads the store's last evaluated key through an opaque,
//! round-trippable pagination token.

use crate::{common, error, store};

use base64::{Engine as _, engine::general_purpose};
use std::cmp;

/// When the engine stops issuing further page requests.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RetrievalPolicy {
    /// Stop after exactly one page, even if the store reports more data.
    ///
    /// This is the default on purpose: callers that did not ask for more get
    /// one page and a token to continue with.
    #[default]
    SinglePage,
    /// Stop once at least this many items have accumulated, or at the natural
    /// end.
    Limit(usize),
    /// Keep fetching until the store reports no further key.
    Full,
}

/// How a retrieval run is driven: the stop policy and an optional resume
/// token from an earlier run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Retrieval {
    /// The stop condition.
    pub policy: RetrievalPolicy,
    /// Token returned by a previous retrieval to resume after.
    pub start_token: Option<String>,
}

/// The result of a retrieval run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Retrieved {
    /// All accumulated items, in store order.
    pub items: Vec<common::Attributes>,
    /// Resume token, absent when the run ended at the natural end of the
    /// result set.
    pub pagination_token: Option<String>,
}

/// One page source: a prepared query or scan request.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PageRequest {
    Query(store::QueryRequest),
    Scan(store::ScanRequest),
}

impl PageRequest {
    async fn issue<S: store::Store>(
        &self,
        store: &S,
        limit: Option<i32>,
        exclusive_start_key: Option<common::Attributes>,
    ) -> error::Result<store::Page> {
        match self {
            Self::Query(request) => {
                let mut request = request.clone();
                if limit.is_some() {
                    request.limit = limit;
                }
                request.exclusive_start_key = exclusive_start_key;
                store.query(request).await
            }
            Self::Scan(request) => {
                let mut request = request.clone();
                if limit.is_some() {
                    request.limit = limit;
                }
                request.exclusive_start_key = exclusive_start_key;
                store.scan(request).await
            }
        }
    }
}

/// Drive page requests until the policy's stop condition holds.
///
/// Store errors propagate untouched; retry belongs to the store client, not
/// this loop.
pub(crate) async fn run<S: store::Store>(
    store: &S,
    request: PageRequest,
    retrieval: Retrieval,
) -> error::Result<Retrieved> {
    let mut items: Vec<common::Attributes> = Vec::new();
    let mut next_key = match retrieval.start_token {
        Some(token) => Some(decode_token(&token)?),
        None => None,
    };
    loop {
        let page_limit = match retrieval.policy {
            RetrievalPolicy::Limit(limit) => {
                Some(cmp::max(limit.saturating_sub(items.len()), 1) as i32)
            }
            _ => None,
        };
        let page = request.issue(store, page_limit, next_key.take()).await?;
        items.extend(page.items);
        let done = match retrieval.policy {
            RetrievalPolicy::SinglePage => true,
            RetrievalPolicy::Limit(limit) => {
                items.len() >= limit || page.last_evaluated_key.is_none()
            }
            RetrievalPolicy::Full => page.last_evaluated_key.is_none(),
        };
        if done {
            let pagination_token = page
                .last_evaluated_key
                .as_ref()
                .map(encode_token)
                .transpose()?;
            return Ok(Retrieved {
                items,
                pagination_token,
            });
        }
        next_key = page.last_evaluated_key;
    }
}

/// Encode a last evaluated key into an opaque token.
///
/// The token is the base64 of the key's JSON form; callers round-trip it
/// unchanged.
pub fn encode_token(key: &common::Attributes) -> error::Result<String> {
    let json: serde_json::Value = serde_dynamo::from_item(key.clone())?;
    let bytes =
        serde_json::to_vec(&json).map_err(|source| error::Error::Token(source.to_string()))?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a token back into the identical last evaluated key.
pub fn decode_token(token: &str) -> error::Result<common::Attributes> {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|source| error::Error::Token(source.to_string()))?;
    let json: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|source| error::Error::Token(source.to_string()))?;
    Ok(serde_dynamo::to_item(json)?)
}
