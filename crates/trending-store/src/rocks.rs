// crates/trending-store/src/rocks.rs
//
// RocksDB-backed `KeyValueStore`.
//
// Key format:
//   - Primary: `item:{partitionKey}\0{sortKey}` -> JSON-serialized Item
//   - Index:   `index:{name}\0{partitionValue}\0{sortValue}{partitionKey}\0{sortKey}`
//              -> JSON-serialized ExclusiveStartKey (the entry's own position)
//
// Index sort values are encoded so that byte order matches value order
// (numbers before strings, numbers by magnitude), which turns an ordered
// index query into a plain RocksDB range iteration. Conditional writes are
// serialized through a write lock, and each one commits its primary row and
// index entries in a single `WriteBatch`.

use std::sync::Mutex;

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use tracing::warn;

use trending_core::error::StoreError;
use trending_core::expr::{apply_updates, AttributeValue, Condition, Item, Update};
use trending_core::score;
use trending_core::traits::{
    ExclusiveStartKey, IndexQuery, IndexSpec, KeyValueStore, PrimaryKey, QueryPage,
    ReadConsistency,
};

const TAG_NUMBER: u8 = 0x01;
const TAG_STRING: u8 = 0x02;

/// RocksDB wrapper implementing the `KeyValueStore` trait.
///
/// Only indexes registered with `with_index` are maintained and queryable.
/// Reads always observe the latest committed write.
#[derive(Debug)]
pub struct RocksKvStore {
    db: DBWithThreadMode<MultiThreaded>,
    indexes: Vec<IndexSpec>,
    write_lock: Mutex<()>,
}

impl RocksKvStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| StoreError::Backend(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self {
            db,
            indexes: Vec::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Maintain and serve the given secondary index.
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        if !self.indexes.contains(&index) {
            self.indexes.push(index);
        }
        self
    }

    /// Build the primary key: `item:{partitionKey}\0{sortKey}`.
    fn item_key(key: &PrimaryKey) -> Vec<u8> {
        let mut out = b"item:".to_vec();
        out.extend_from_slice(key.partition_key.as_bytes());
        out.push(0);
        out.extend_from_slice(key.sort_key.as_bytes());
        out
    }

    /// Prefix shared by every entry of one index partition.
    fn index_prefix(index: &IndexSpec, partition_value: &str) -> Vec<u8> {
        let mut out = b"index:".to_vec();
        out.extend_from_slice(index.name.as_bytes());
        out.push(0);
        out.extend_from_slice(partition_value.as_bytes());
        out.push(0);
        out
    }

    /// Full index key for a position within a partition.
    fn index_key(
        index: &IndexSpec,
        partition_value: &str,
        position: &ExclusiveStartKey,
    ) -> Result<Vec<u8>, StoreError> {
        let mut out = Self::index_prefix(index, partition_value);
        encode_sort_value(&position.index_sort, &mut out)?;
        out.extend_from_slice(position.primary.partition_key.as_bytes());
        out.push(0);
        out.extend_from_slice(position.primary.sort_key.as_bytes());
        Ok(out)
    }

    /// Index key and position for `item` in `index`, if the item belongs to it.
    fn index_entry(
        index: &IndexSpec,
        item: &Item,
    ) -> Result<Option<(Vec<u8>, ExclusiveStartKey)>, StoreError> {
        let partition_value = match item.get(index.partition_attr).and_then(AttributeValue::as_s) {
            Some(p) => p,
            None => return Ok(None),
        };
        match ExclusiveStartKey::from_item(item, index) {
            Some(position) => {
                let key = Self::index_key(index, partition_value, &position)?;
                Ok(Some((key, position)))
            }
            None => Ok(None),
        }
    }

    /// Get and decode the item stored under a primary key.
    fn read_item(&self, key: &PrimaryKey) -> Result<Option<Item>, StoreError> {
        let bytes = self
            .db
            .get(Self::item_key(key))
            .map_err(|e| StoreError::Backend(format!("RocksDB get failed: {}", e)))?;
        decode_item(bytes)
    }

    /// Replace `old` with `new` (either may be absent) in one batch, keeping
    /// every registered index in step.
    fn commit(
        &self,
        key: &PrimaryKey,
        old: Option<&Item>,
        new: Option<&Item>,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();

        for index in &self.indexes {
            let old_entry = match old {
                Some(item) => Self::index_entry(index, item)?,
                None => None,
            };
            let new_entry = match new {
                Some(item) => Self::index_entry(index, item)?,
                None => None,
            };
            let old_key = old_entry.as_ref().map(|(k, _)| k);
            let new_key = new_entry.as_ref().map(|(k, _)| k);
            if old_key == new_key {
                continue;
            }
            if let Some((entry, _)) = old_entry {
                batch.delete(entry);
            }
            if let Some((entry, position)) = new_entry {
                batch.put(entry, serde_json::to_vec(&position)?);
            }
        }

        match new {
            Some(item) => batch.put(Self::item_key(key), serde_json::to_vec(item)?),
            None => batch.delete(Self::item_key(key)),
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Backend(format!("RocksDB write failed: {}", e)))
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Backend("RocksDB write lock poisoned".to_string()))
    }
}

fn decode_item(bytes: Option<Vec<u8>>) -> Result<Option<Item>, StoreError> {
    match bytes {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn check(condition: Option<&Condition>, current: Option<&Item>) -> Result<(), StoreError> {
    match condition {
        Some(c) if !c.evaluate(current) => Err(StoreError::ConditionalCheckFailed),
        _ => Ok(()),
    }
}

/// Append an order-preserving encoding of an index sort value.
///
/// Numbers: tag, 4-byte big-endian integer-digit count, integer digits (no
/// leading zeros), fractional digits (no trailing zeros), then a 0x00
/// terminator that sorts below every digit. Strings: tag, bytes, terminator.
/// Negative numbers are never indexed by this engine and are rejected.
fn encode_sort_value(value: &AttributeValue, out: &mut Vec<u8>) -> Result<(), StoreError> {
    match value {
        AttributeValue::S(s) => {
            out.push(TAG_STRING);
            out.extend_from_slice(s.as_bytes());
        }
        AttributeValue::N(n) => {
            if score::is_negative(n) {
                return Err(StoreError::Backend(format!(
                    "negative index sort value {} is not supported",
                    n
                )));
            }
            let (digits, scale) = n.normalized().as_bigint_and_exponent();
            let digits = digits.to_string();
            let (int_part, frac_part) = if scale <= 0 {
                (format!("{}{}", digits, "0".repeat((-scale) as usize)), String::new())
            } else if digits.len() as i64 > scale {
                let split = digits.len() - scale as usize;
                (digits[..split].to_string(), digits[split..].to_string())
            } else {
                let padding = "0".repeat(scale as usize - digits.len());
                (String::new(), format!("{}{}", padding, digits))
            };
            let int_part = int_part.trim_start_matches('0');

            out.push(TAG_NUMBER);
            out.extend_from_slice(&(int_part.len() as u32).to_be_bytes());
            out.extend_from_slice(int_part.as_bytes());
            out.extend_from_slice(frac_part.as_bytes());
        }
    }
    out.push(0);
    Ok(())
}

#[async_trait]
impl KeyValueStore for RocksKvStore {
    async fn get_item(
        &self,
        key: &PrimaryKey,
        _consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError> {
        self.read_item(key)
    }

    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<(), StoreError> {
        let key = PrimaryKey::from_item(&item)
            .ok_or_else(|| StoreError::Backend("item is missing its primary key".to_string()))?;
        let _guard = self.lock_writes()?;
        let current = self.read_item(&key)?;
        check(condition.as_ref(), current.as_ref())?;
        self.commit(&key, current.as_ref(), Some(&item))
    }

    async fn update_item(
        &self,
        key: &PrimaryKey,
        updates: &[Update],
        condition: Option<Condition>,
    ) -> Result<Item, StoreError> {
        let _guard = self.lock_writes()?;
        let current = self.read_item(key)?;
        check(condition.as_ref(), current.as_ref())?;

        let mut next = current.clone().unwrap_or_else(|| {
            let mut fresh = Item::new();
            key.write_to(&mut fresh);
            fresh
        });
        apply_updates(&mut next, updates)?;
        self.commit(key, current.as_ref(), Some(&next))?;
        Ok(next)
    }

    async fn delete_item(
        &self,
        key: &PrimaryKey,
        condition: Option<Condition>,
    ) -> Result<Option<Item>, StoreError> {
        let _guard = self.lock_writes()?;
        let current = self.read_item(key)?;
        check(condition.as_ref(), current.as_ref())?;
        if current.is_some() {
            self.commit(key, current.as_ref(), None)?;
        }
        Ok(current)
    }

    async fn query_index(&self, query: &IndexQuery) -> Result<QueryPage, StoreError> {
        if !self.indexes.contains(&query.index) {
            return Err(StoreError::Backend(format!(
                "index {} is not registered",
                query.index.name
            )));
        }

        let prefix = Self::index_prefix(&query.index, &query.partition_value);
        let start_key = match &query.exclusive_start_key {
            Some(after) => Some(Self::index_key(&query.index, &query.partition_value, after)?),
            None => None,
        };

        let mode = match (&start_key, query.ascending) {
            (Some(start), true) => IteratorMode::From(start, Direction::Forward),
            (None, true) => IteratorMode::From(&prefix, Direction::Forward),
            (Some(start), false) => IteratorMode::From(start, Direction::Reverse),
            (None, false) => {
                // Seek to the last possible key of the partition. The prefix
                // ends with 0x00, so bumping that byte bounds the partition.
                let mut upper = prefix.clone();
                if let Some(last) = upper.last_mut() {
                    *last = 1;
                }
                return self.collect_page(query, &prefix, IteratorMode::From(&upper, Direction::Reverse), None);
            }
        };

        self.collect_page(query, &prefix, mode, start_key.as_deref())
    }
}

impl RocksKvStore {
    /// Walk the index from `mode`, skipping `skip` (the exclusive start key)
    /// and stopping at the partition boundary or one past the page limit.
    ///
    /// Index entries and rows are read from one snapshot, and the cursor is
    /// the position stored in the last index entry walked, so a concurrent
    /// re-score cannot shift the page boundary.
    fn collect_page(
        &self,
        query: &IndexQuery,
        prefix: &[u8],
        mode: IteratorMode<'_>,
        skip: Option<&[u8]>,
    ) -> Result<QueryPage, StoreError> {
        let limit = query.limit.unwrap_or(usize::MAX);
        let snapshot = self.db.snapshot();
        let mut items = Vec::new();
        let mut walked = 0;
        let mut last_position = None;
        let mut has_more = false;

        for entry in snapshot.iterator(mode) {
            let (key, value) = entry
                .map_err(|e| StoreError::Backend(format!("RocksDB iteration error: {}", e)))?;

            // Stop when the prefix no longer matches.
            if !key.starts_with(prefix) {
                break;
            }
            if skip == Some(&key[..]) {
                continue;
            }
            if walked == limit {
                has_more = true;
                break;
            }
            walked += 1;

            let position: ExclusiveStartKey = serde_json::from_slice(&value)?;
            let bytes = snapshot
                .get(Self::item_key(&position.primary))
                .map_err(|e| StoreError::Backend(format!("RocksDB get failed: {}", e)))?;
            match decode_item(bytes)? {
                Some(item) => items.push(item),
                None => warn!(
                    "Index {} points at missing item {}",
                    query.index.name,
                    position.primary.partition_key
                ),
            }
            last_position = Some(position);
        }

        Ok(QueryPage {
            items,
            last_evaluated_key: if has_more { last_position } else { None },
        })
    }
}
