// crates/trending-store/src/mem.rs
//
// In-memory `KeyValueStore` with atomic conditional writes.
//
// Every mutation evaluates its condition and applies its change under one
// mutex guard, which gives the same compare-and-swap guarantee a remote store
// provides. Index queries filter and sort the whole table on each call, so
// this backend is meant for tests and local development, not large datasets.
// All reads are strongly consistent regardless of the requested consistency.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use trending_core::error::StoreError;
use trending_core::expr::{apply_updates, AttributeValue, Condition, Item, Update};
use trending_core::traits::{
    ExclusiveStartKey, IndexQuery, KeyValueStore, PrimaryKey, QueryPage, ReadConsistency,
};

/// Mutex-guarded table of items keyed by primary key.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    items: Mutex<BTreeMap<PrimaryKey, Item>>,
}

impl MemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of items currently stored.
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Return whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> Result<MutexGuard<'_, BTreeMap<PrimaryKey, Item>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Backend("in-memory table lock poisoned".to_string()))
    }
}

fn check(condition: Option<&Condition>, current: Option<&Item>) -> Result<(), StoreError> {
    match condition {
        Some(c) if !c.evaluate(current) => Err(StoreError::ConditionalCheckFailed),
        _ => Ok(()),
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get_item(
        &self,
        key: &PrimaryKey,
        _consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError> {
        Ok(self.table()?.get(key).cloned())
    }

    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<(), StoreError> {
        let key = PrimaryKey::from_item(&item)
            .ok_or_else(|| StoreError::Backend("item is missing its primary key".to_string()))?;
        let mut table = self.table()?;
        check(condition.as_ref(), table.get(&key))?;
        table.insert(key, item);
        Ok(())
    }

    async fn update_item(
        &self,
        key: &PrimaryKey,
        updates: &[Update],
        condition: Option<Condition>,
    ) -> Result<Item, StoreError> {
        let mut table = self.table()?;
        check(condition.as_ref(), table.get(key))?;

        // Updating an absent item creates it from the key, as remote stores do.
        let mut next = table.get(key).cloned().unwrap_or_else(|| {
            let mut fresh = Item::new();
            key.write_to(&mut fresh);
            fresh
        });
        apply_updates(&mut next, updates)?;
        table.insert(key.clone(), next.clone());
        Ok(next)
    }

    async fn delete_item(
        &self,
        key: &PrimaryKey,
        condition: Option<Condition>,
    ) -> Result<Option<Item>, StoreError> {
        let mut table = self.table()?;
        check(condition.as_ref(), table.get(key))?;
        Ok(table.remove(key))
    }

    async fn query_index(&self, query: &IndexQuery) -> Result<QueryPage, StoreError> {
        let table = self.table()?;
        let partition = AttributeValue::S(query.partition_value.clone());

        let mut matches: Vec<(ExclusiveStartKey, &Item)> = table
            .values()
            .filter(|item| item.get(query.index.partition_attr) == Some(&partition))
            .filter_map(|item| {
                ExclusiveStartKey::from_item(item, &query.index).map(|pos| (pos, item))
            })
            .collect();
        matches.sort_by(|(a, _), (b, _)| a.position_cmp(b));
        if !query.ascending {
            matches.reverse();
        }

        // Resume strictly after the start key in scan direction.
        let start = match &query.exclusive_start_key {
            Some(after) => matches
                .iter()
                .position(|(pos, _)| {
                    let ord = pos.position_cmp(after);
                    if query.ascending {
                        ord.is_gt()
                    } else {
                        ord.is_lt()
                    }
                })
                .unwrap_or(matches.len()),
            None => 0,
        };

        let remaining = &matches[start..];
        let take = query.limit.unwrap_or(remaining.len()).min(remaining.len());
        let page = &remaining[..take];
        let last_evaluated_key = if take < remaining.len() {
            page.last().map(|(pos, _)| pos.clone())
        } else {
            None
        };

        Ok(QueryPage {
            items: page.iter().map(|(_, item)| (*item).clone()).collect(),
            last_evaluated_key,
        })
    }
}
