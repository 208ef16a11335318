// crates/trending-core/src/error.rs

use thiserror::Error;

/// Errors raised at the `KeyValueStore` seam.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional put/update/delete was rejected because its predicate
    /// did not hold at apply time (or the item was absent).
    #[error("Conditional check failed")]
    ConditionalCheckFailed,

    /// Backend failure: I/O, throttling, unavailability, corrupt pages.
    #[error("Storage error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Typed outcomes of trending engine operations.
///
/// Precondition violations (negative scores, a deflate target that does not
/// strictly lower the score) are not represented here: they panic.
#[derive(Debug, Error)]
pub enum TrendingError {
    /// `add` was called against an identity that already exists.
    #[error("Trending for {item_type} `{item_id}` already exists")]
    AlreadyExists { item_type: String, item_id: String },

    /// A conditional operation's precondition failed. The store cannot cheaply
    /// tell "absent" apart from "value mismatch", so both land here; re-read
    /// to disambiguate.
    #[error("Trending for {item_type} `{item_id}` does not exist or has changed")]
    NotFoundOrStale { item_type: String, item_id: String },

    /// Transport/service error from the store, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored item could not be decoded into a `TrendingRecord`.
    #[error("Invalid trending record: {0}")]
    InvalidRecord(String),
}

impl TrendingError {
    pub fn already_exists(item_type: &str, item_id: &str) -> Self {
        TrendingError::AlreadyExists {
            item_type: item_type.to_string(),
            item_id: item_id.to_string(),
        }
    }

    pub fn not_found_or_stale(item_type: &str, item_id: &str) -> Self {
        TrendingError::NotFoundOrStale {
            item_type: item_type.to_string(),
            item_id: item_id.to_string(),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, TrendingError::AlreadyExists { .. })
    }

    pub fn is_not_found_or_stale(&self) -> bool {
        matches!(self, TrendingError::NotFoundOrStale { .. })
    }
}
