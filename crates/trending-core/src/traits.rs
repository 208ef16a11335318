// crates/trending-core/src/traits.rs

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::expr::{AttributeValue, Condition, Item, Update};

/// Attribute holding the partition half of every primary key.
pub const ATTR_PARTITION_KEY: &str = "partitionKey";
/// Attribute holding the sort half of every primary key.
pub const ATTR_SORT_KEY: &str = "sortKey";

/// Composite primary key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl PrimaryKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Read the primary key attributes out of an item.
    pub fn from_item(item: &Item) -> Option<Self> {
        let partition_key = item.get(ATTR_PARTITION_KEY)?.as_s()?;
        let sort_key = item.get(ATTR_SORT_KEY)?.as_s()?;
        Some(Self::new(partition_key, sort_key))
    }

    /// Write the primary key attributes into an item.
    pub fn write_to(&self, item: &mut Item) {
        item.insert(ATTR_PARTITION_KEY.to_string(), self.partition_key.as_str().into());
        item.insert(ATTR_SORT_KEY.to_string(), self.sort_key.as_str().into());
    }
}

/// Read consistency for point lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadConsistency {
    /// May return a stale value.
    #[default]
    Eventual,
    /// Reflects every write acknowledged before the read.
    Strong,
}

/// A secondary index: items carrying both attributes are indexed under
/// `partition_attr`, ordered by `sort_attr` then by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub partition_attr: &'static str,
    pub sort_attr: &'static str,
}

/// Position of an item within an index; queries resume strictly after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusiveStartKey {
    pub index_sort: AttributeValue,
    pub primary: PrimaryKey,
}

impl ExclusiveStartKey {
    /// Position of `item` in `index`, if the item is indexed there.
    pub fn from_item(item: &Item, index: &IndexSpec) -> Option<Self> {
        Some(Self {
            index_sort: item.get(index.sort_attr)?.clone(),
            primary: PrimaryKey::from_item(item)?,
        })
    }

    /// Total order of index positions: sort value first, primary key as tie-break.
    pub fn position_cmp(&self, other: &ExclusiveStartKey) -> Ordering {
        self.index_sort
            .index_cmp(&other.index_sort)
            .then_with(|| self.primary.cmp(&other.primary))
    }
}

/// One page request against a secondary index.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub index: IndexSpec,
    pub partition_value: String,
    pub ascending: bool,
    /// Maximum items per page; `None` lets the backend choose.
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<ExclusiveStartKey>,
}

/// One page of index query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Set when more items may follow; pass it back as the next
    /// `exclusive_start_key`.
    pub last_evaluated_key: Option<ExclusiveStartKey>,
}

/// Remote key-value store with conditional writes and ordered index scans.
///
/// Implemented by trending-store (in-memory and RocksDB backends). Every
/// conditional write must be atomic: the condition is evaluated and the
/// mutation applied as one step, or `StoreError::ConditionalCheckFailed`
/// is returned and nothing changes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Point lookup.
    async fn get_item(
        &self,
        key: &PrimaryKey,
        consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError>;

    /// Write a whole item, replacing any existing one if `condition` holds.
    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<(), StoreError>;

    /// Apply `updates` to the item at `key` if `condition` holds.
    /// Returns the item as it is after the update.
    async fn update_item(
        &self,
        key: &PrimaryKey,
        updates: &[Update],
        condition: Option<Condition>,
    ) -> Result<Item, StoreError>;

    /// Remove the item at `key` if `condition` holds.
    /// Returns the removed item, or `None` if nothing was stored.
    async fn delete_item(
        &self,
        key: &PrimaryKey,
        condition: Option<Condition>,
    ) -> Result<Option<Item>, StoreError>;

    /// Fetch one page of items from a secondary index.
    async fn query_index(&self, query: &IndexQuery) -> Result<QueryPage, StoreError>;
}
