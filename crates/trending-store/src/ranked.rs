// crates/trending-store/src/ranked.rs
//
// RankedEnumerator: lazy, forward-only, ascending-by-score enumeration of all
// trending records of one item type, driven by the ranking index.
//
// Pages are fetched on demand with the store's continuation cursor until the
// store reports no further page. There is no snapshot: records added, removed,
// or re-scored during a scan may or may not be observed. Within one scan the
// scores are non-decreasing; equal scores are ordered by partition key (that
// is, by item id), and because the cursor carries (score, partition key) that
// tie order is stable across page boundaries.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tracing::debug;

use trending_core::error::TrendingError;
use trending_core::expr::Item;
use trending_core::record::RANKING_INDEX;
use trending_core::traits::{ExclusiveStartKey, IndexQuery, KeyValueStore};
use trending_core::TrendingRecord;

/// Forward-only cursor over one item type's records, lowest score first.
///
/// Not restartable: once consumed, start a new scan with
/// `TrendingStore::ranked_scan`.
pub struct RankedEnumerator {
    client: Arc<dyn KeyValueStore>,
    item_type: String,
    page_size: usize,
    buffer: VecDeque<Item>,
    /// Cursor for the next page; `None` before the first fetch and at the end.
    resume_after: Option<ExclusiveStartKey>,
    exhausted: bool,
    pages_fetched: usize,
}

impl std::fmt::Debug for RankedEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankedEnumerator")
            .field("item_type", &self.item_type)
            .field("page_size", &self.page_size)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

impl RankedEnumerator {
    pub(crate) fn new(client: Arc<dyn KeyValueStore>, item_type: &str, page_size: usize) -> Self {
        Self {
            client,
            item_type: item_type.to_string(),
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            resume_after: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// Number of index pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next record in ascending score order, or `None` once the scan is done.
    pub async fn next(&mut self) -> Result<Option<TrendingRecord>, TrendingError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return TrendingRecord::from_item(&item).map(Some);
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    /// Drain the remaining records into a `Vec`.
    pub async fn try_collect_all(mut self) -> Result<Vec<TrendingRecord>, TrendingError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Adapt into a `Stream` of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<TrendingRecord, TrendingError>> {
        stream::try_unfold(self, |mut scan| async move {
            let next = scan.next().await?;
            Ok::<_, TrendingError>(next.map(|record| (record, scan)))
        })
    }

    async fn fetch_page(&mut self) -> Result<(), TrendingError> {
        let query = IndexQuery {
            index: RANKING_INDEX,
            partition_value: TrendingRecord::ranking_partition(&self.item_type),
            ascending: true,
            limit: Some(self.page_size),
            exclusive_start_key: self.resume_after.clone(),
        };
        // Cursor state only advances once a page arrives, so a failed fetch
        // can be retried by calling `next` again.
        let page = self.client.query_index(&query).await?;
        self.pages_fetched += 1;

        debug!(
            "Ranked scan of {}: page {} returned {} items (more: {})",
            self.item_type,
            self.pages_fetched,
            page.items.len(),
            page.last_evaluated_key.is_some()
        );

        self.exhausted = page.last_evaluated_key.is_none();
        self.resume_after = page.last_evaluated_key;
        self.buffer.extend(page.items);
        Ok(())
    }
}
