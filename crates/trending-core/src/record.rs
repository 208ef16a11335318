// crates/trending-core/src/record.rs
//
// The persisted shape of one item's trending state.
//
// Wire shape (field names are the persisted contract):
//   partitionKey       = "{itemType}/{itemId}"
//   sortKey            = "trending"
//   schemaVersion      = 0
//   gsiK3PartitionKey  = "{itemType}/trending"   (ranking index partition)
//   gsiK3SortKey       = canonical score          (ranking index sort)
//   lastDeflatedAt     = ISO-8601 UTC timestamp
//   createdAt          = ISO-8601 UTC timestamp

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrendingError;
use crate::expr::{AttributeValue, Item};
use crate::traits::{IndexSpec, PrimaryKey, ATTR_PARTITION_KEY};

/// Constant sort key shared by every trending record.
pub const TRENDING_SORT_KEY: &str = "trending";
/// Schema version written for this record kind.
pub const SCHEMA_VERSION: u32 = 0;

pub const ATTR_SCHEMA_VERSION: &str = "schemaVersion";
pub const ATTR_RANKING_PARTITION: &str = "gsiK3PartitionKey";
pub const ATTR_RANKING_SORT: &str = "gsiK3SortKey";
pub const ATTR_LAST_DEFLATED_AT: &str = "lastDeflatedAt";
pub const ATTR_CREATED_AT: &str = "createdAt";

/// Score-ordered index over all records of one item type.
pub const RANKING_INDEX: IndexSpec = IndexSpec {
    name: "GSI-K3",
    partition_attr: ATTR_RANKING_PARTITION,
    sort_attr: ATTR_RANKING_SORT,
};

/// Trending state of a single (item type, item id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingRecord {
    pub item_type: String,
    pub item_id: String,
    /// Canonical score (see `score::quantize`). Never negative.
    pub score: BigDecimal,
    pub created_at: DateTime<Utc>,
    /// Identifies the current deflation generation.
    pub last_deflated_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl TrendingRecord {
    /// Primary key for an identity: `"{itemType}/{itemId}"` + `"trending"`.
    pub fn primary_key(item_type: &str, item_id: &str) -> PrimaryKey {
        PrimaryKey::new(format!("{}/{}", item_type, item_id), TRENDING_SORT_KEY)
    }

    /// Ranking index partition value for an item type.
    pub fn ranking_partition(item_type: &str) -> String {
        format!("{}/trending", item_type)
    }

    pub fn key(&self) -> PrimaryKey {
        Self::primary_key(&self.item_type, &self.item_id)
    }

    /// Encode into the wire shape.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        self.key().write_to(&mut item);
        item.insert(
            ATTR_SCHEMA_VERSION.to_string(),
            AttributeValue::N(BigDecimal::from(self.schema_version)),
        );
        item.insert(
            ATTR_RANKING_PARTITION.to_string(),
            Self::ranking_partition(&self.item_type).into(),
        );
        item.insert(ATTR_RANKING_SORT.to_string(), self.score.clone().into());
        item.insert(
            ATTR_LAST_DEFLATED_AT.to_string(),
            format_timestamp(&self.last_deflated_at).into(),
        );
        item.insert(
            ATTR_CREATED_AT.to_string(),
            format_timestamp(&self.created_at).into(),
        );
        item
    }

    /// Decode from the wire shape.
    ///
    /// Both the item type and the item id may contain `/`, so the type is
    /// taken from the ranking partition (`"{itemType}/trending"`) and then
    /// stripped off the front of the primary partition key.
    pub fn from_item(item: &Item) -> Result<Self, TrendingError> {
        let partition_key = string_attr(item, ATTR_PARTITION_KEY)?;
        let ranking_partition = string_attr(item, ATTR_RANKING_PARTITION)?;
        let item_type = ranking_partition.strip_suffix("/trending").ok_or_else(|| {
            TrendingError::InvalidRecord(format!(
                "malformed ranking partition `{}`",
                ranking_partition
            ))
        })?;
        let item_id = partition_key
            .strip_prefix(item_type)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                TrendingError::InvalidRecord(format!(
                    "partition key `{}` does not belong to item type `{}`",
                    partition_key, item_type
                ))
            })?;

        let schema_version = number_attr(item, ATTR_SCHEMA_VERSION)?;
        if *schema_version != BigDecimal::from(SCHEMA_VERSION) {
            return Err(TrendingError::InvalidRecord(format!(
                "unsupported schema version {} for `{}`",
                schema_version, partition_key
            )));
        }

        Ok(Self {
            item_type: item_type.to_string(),
            item_id: item_id.to_string(),
            score: number_attr(item, ATTR_RANKING_SORT)?.clone(),
            created_at: parse_timestamp(string_attr(item, ATTR_CREATED_AT)?)?,
            last_deflated_at: parse_timestamp(string_attr(item, ATTR_LAST_DEFLATED_AT)?)?,
            schema_version: SCHEMA_VERSION,
        })
    }
}

/// Format a timestamp as ISO-8601 UTC with a `Z` suffix, keeping only as many
/// fractional digits as needed. Conditions compare this string exactly.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an ISO-8601 timestamp written by `format_timestamp`.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TrendingError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TrendingError::InvalidRecord(format!("bad timestamp `{}`: {}", s, e)))
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str, TrendingError> {
    item.get(name)
        .and_then(AttributeValue::as_s)
        .ok_or_else(|| TrendingError::InvalidRecord(format!("missing string attribute `{}`", name)))
}

fn number_attr<'a>(item: &'a Item, name: &str) -> Result<&'a BigDecimal, TrendingError> {
    item.get(name)
        .and_then(AttributeValue::as_n)
        .ok_or_else(|| TrendingError::InvalidRecord(format!("missing number attribute `{}`", name)))
}
