// crates/trending-store/src/engine.rs
//
// TrendingStore: the decaying-score engine.
//
// Every operation is exactly one request to the `KeyValueStore`. State
// transitions are enforced by the store's conditional writes, never by
// read-then-write here:
//
//   Absent --add--> Active --increment (score up)--> Active
//                   Active --deflate (score down, generation advances)--> Active
//                   Active --delete--> Absent

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use trending_core::error::{StoreError, TrendingError};
use trending_core::expr::{AttributeValue, Condition, Update};
use trending_core::record::{
    format_timestamp, ATTR_LAST_DEFLATED_AT, ATTR_RANKING_SORT, SCHEMA_VERSION,
};
use trending_core::score;
use trending_core::traits::{KeyValueStore, ReadConsistency, ATTR_PARTITION_KEY};
use trending_core::{BigDecimal, TrendingRecord};

use crate::ranked::RankedEnumerator;

/// Page size used by ranked scans unless overridden.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Trending score store over a caller-owned `KeyValueStore` client.
///
/// Cloning is cheap; clones share the same client handle. The engine keeps
/// no other state, so it can be used from any number of tasks at once.
#[derive(Clone)]
pub struct TrendingStore {
    client: Arc<dyn KeyValueStore>,
    page_size: usize,
}

impl std::fmt::Debug for TrendingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendingStore")
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl TrendingStore {
    /// Create an engine over the given store client.
    pub fn new(client: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of records fetched per ranked-scan page (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Create the trending record for an identity.
    ///
    /// The stored score is `quantize(initial_score)`; `created_at` and
    /// `last_deflated_at` are both `now`. Fails with `AlreadyExists` if the
    /// identity is already present.
    ///
    /// # Panics
    ///
    /// Panics if `initial_score` is negative.
    pub async fn add(
        &self,
        item_type: &str,
        item_id: &str,
        initial_score: &BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<TrendingRecord, TrendingError> {
        let record = TrendingRecord {
            item_type: item_type.to_string(),
            item_id: item_id.to_string(),
            score: score::quantize(initial_score),
            created_at: now,
            last_deflated_at: now,
            schema_version: SCHEMA_VERSION,
        };

        let condition = Condition::attribute_not_exists(ATTR_PARTITION_KEY);
        match self.client.put_item(record.to_item(), Some(condition)).await {
            Ok(()) => {
                debug!("Added trending {}/{} with score {}", item_type, item_id, record.score);
                Ok(record)
            }
            Err(StoreError::ConditionalCheckFailed) => {
                debug!("Trending {}/{} already exists", item_type, item_id);
                Err(TrendingError::already_exists(item_type, item_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Point lookup. An absent record is `Ok(None)`, not an error.
    pub async fn get(
        &self,
        item_type: &str,
        item_id: &str,
        consistency: ReadConsistency,
    ) -> Result<Option<TrendingRecord>, TrendingError> {
        let key = TrendingRecord::primary_key(item_type, item_id);
        match self.client.get_item(&key, consistency).await? {
            Some(item) => Ok(Some(TrendingRecord::from_item(&item)?)),
            None => Ok(None),
        }
    }

    /// Atomically add `quantize(delta)` to the stored score.
    ///
    /// Conditioned on the stored `last_deflated_at` equaling
    /// `expected_last_deflated_at` exactly: a delta computed against an older
    /// deflation generation is rejected with `NotFoundOrStale` and must be
    /// recomputed by the caller. Returns the updated record.
    ///
    /// # Panics
    ///
    /// Panics if `delta` is negative.
    pub async fn increment_score(
        &self,
        item_type: &str,
        item_id: &str,
        delta: &BigDecimal,
        expected_last_deflated_at: DateTime<Utc>,
    ) -> Result<TrendingRecord, TrendingError> {
        let delta = score::quantize(delta);
        let key = TrendingRecord::primary_key(item_type, item_id);
        let updates = [Update::add(ATTR_RANKING_SORT, delta.clone())];
        let condition = Condition::equals(
            ATTR_LAST_DEFLATED_AT,
            format_timestamp(&expected_last_deflated_at),
        );

        match self.client.update_item(&key, &updates, Some(condition)).await {
            Ok(item) => {
                let record = TrendingRecord::from_item(&item)?;
                debug!(
                    "Incremented trending {}/{} by {} to {}",
                    item_type, item_id, delta, record.score
                );
                Ok(record)
            }
            Err(StoreError::ConditionalCheckFailed) => {
                debug!("Increment of {}/{} rejected: absent or stale generation", item_type, item_id);
                Err(TrendingError::not_found_or_stale(item_type, item_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically set the score to `quantize(new_score)` and start a new
    /// deflation generation at `now`.
    ///
    /// Conditioned on (a) the stored score equaling `expected_score` exactly,
    /// with no re-quantization, and (b) the stored `last_deflated_at` falling
    /// on `expected_last_deflated_date`. If either fails the result is
    /// `NotFoundOrStale`, so two overlapping deflation passes over the same
    /// generation cannot both succeed. Returns the updated record.
    ///
    /// `expected_score` must be the canonical value previously read from this
    /// store. A non-canonical value is logged and sent as-is; it will not match.
    ///
    /// `now` must not precede the current generation. The store condition
    /// only pins the calendar date, so ordering within that day is the
    /// caller's responsibility; `now` on an earlier date is rejected here.
    ///
    /// # Panics
    ///
    /// Panics, before any request is issued, if `new_score` is negative, if
    /// `new_score` or `quantize(new_score)` is not strictly below
    /// `expected_score`, or if `now` falls on a date before
    /// `expected_last_deflated_date`.
    pub async fn deflate_score(
        &self,
        item_type: &str,
        item_id: &str,
        expected_score: &BigDecimal,
        new_score: &BigDecimal,
        expected_last_deflated_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TrendingRecord, TrendingError> {
        assert!(!score::is_negative(new_score), "Score cannot be negative");
        let quantized = score::quantize(new_score);
        assert!(
            new_score < expected_score && quantized < *expected_score,
            "New score must be less than existing score"
        );
        let new_score = quantized;
        assert!(
            now.date_naive() >= expected_last_deflated_date,
            "Deflation time cannot precede the current generation"
        );
        warn_if_not_canonical(item_type, item_id, expected_score);

        let key = TrendingRecord::primary_key(item_type, item_id);
        let updates = [
            Update::set(ATTR_RANKING_SORT, new_score),
            Update::set(ATTR_LAST_DEFLATED_AT, format_timestamp(&now)),
        ];
        let condition = Condition::And(vec![
            Condition::equals(ATTR_RANKING_SORT, expected_score.clone()),
            Condition::begins_with(ATTR_LAST_DEFLATED_AT, expected_last_deflated_date.to_string()),
        ]);

        match self.client.update_item(&key, &updates, Some(condition)).await {
            Ok(item) => {
                let record = TrendingRecord::from_item(&item)?;
                debug!(
                    "Deflated trending {}/{} from {} to {}",
                    item_type, item_id, expected_score, record.score
                );
                Ok(record)
            }
            Err(StoreError::ConditionalCheckFailed) => {
                debug!("Deflate of {}/{} rejected: absent or stale state", item_type, item_id);
                Err(TrendingError::not_found_or_stale(item_type, item_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the record for an identity.
    ///
    /// With `expected_score`, the delete is conditioned on an exact score
    /// match and fails with `NotFoundOrStale` on mismatch or absence. Without
    /// it, deleting an absent record is a no-op that returns `Ok(None)`.
    /// Returns the removed record when one existed.
    pub async fn delete(
        &self,
        item_type: &str,
        item_id: &str,
        expected_score: Option<&BigDecimal>,
    ) -> Result<Option<TrendingRecord>, TrendingError> {
        let key = TrendingRecord::primary_key(item_type, item_id);
        let condition = expected_score.map(|expected| {
            warn_if_not_canonical(item_type, item_id, expected);
            Condition::equals(ATTR_RANKING_SORT, AttributeValue::N(expected.clone()))
        });

        match self.client.delete_item(&key, condition).await {
            Ok(Some(item)) => {
                debug!("Deleted trending {}/{}", item_type, item_id);
                Ok(Some(TrendingRecord::from_item(&item)?))
            }
            Ok(None) => {
                debug!("Delete of absent trending {}/{} was a no-op", item_type, item_id);
                Ok(None)
            }
            Err(StoreError::ConditionalCheckFailed) => {
                debug!("Delete of {}/{} rejected: absent or score changed", item_type, item_id);
                Err(TrendingError::not_found_or_stale(item_type, item_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lazily enumerate every record of `item_type`, lowest score first.
    pub fn ranked_scan(&self, item_type: &str) -> RankedEnumerator {
        RankedEnumerator::new(self.client.clone(), item_type, self.page_size)
    }
}

fn warn_if_not_canonical(item_type: &str, item_id: &str, expected_score: &BigDecimal) {
    if !score::is_canonical(expected_score) {
        warn!(
            "Expected score {} for {}/{} is not canonical and cannot match a stored score",
            expected_score, item_type, item_id
        );
    }
}
