// crates/trending-core/src/lib.rs
//
// trending-core: Core types, score codec, and store traits for the trending
// engine.
//
// This is the leaf crate of the workspace. It defines the persisted
// `TrendingRecord`, the 9-digit score codec, the error taxonomy, and the
// narrow `KeyValueStore` interface (with its condition/update expression
// model) that storage backends implement.

pub mod error;
pub mod expr;
pub mod record;
pub mod score;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use trending_core::TrendingRecord;`

pub use error::{StoreError, TrendingError};
pub use expr::{AttributeValue, Condition, Item, Update};
pub use record::{TrendingRecord, RANKING_INDEX, SCHEMA_VERSION, TRENDING_SORT_KEY};
pub use traits::{
    ExclusiveStartKey, IndexQuery, IndexSpec, KeyValueStore, PrimaryKey, QueryPage,
    ReadConsistency,
};

// Decimal type used for scores, so callers need not depend on bigdecimal directly.
pub use bigdecimal::BigDecimal;
