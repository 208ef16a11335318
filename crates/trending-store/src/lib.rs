// crates/trending-store/src/lib.rs
//
// trending-store: The trending engine and its storage backends.
//
// Provides `TrendingStore` (add / get / increment / deflate / delete over
// conditional writes), `RankedEnumerator` (lazy lowest-score-first scans of
// one item type), an in-memory `KeyValueStore` for tests and local use, and
// a RocksDB-backed `KeyValueStore` for persistent single-node deployments.

pub mod engine;
pub mod mem;
pub mod ranked;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use engine::{TrendingStore, DEFAULT_PAGE_SIZE};
pub use mem::MemoryKvStore;
pub use ranked::RankedEnumerator;
pub use rocks::RocksKvStore;
