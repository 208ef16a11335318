// crates/trending-store/tests/rocks.rs
//
// TrendingStore over the RocksDB backend: the same contracts as the
// in-memory backend, plus index maintenance and persistence across reopen.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use trending_core::record::RANKING_INDEX;
use trending_core::traits::{IndexQuery, KeyValueStore, PrimaryKey};
use trending_core::{BigDecimal, ReadConsistency, StoreError, TrendingRecord};
use trending_store::{RocksKvStore, TrendingStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_db_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("trending_test_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

fn open(path: &str) -> Arc<RocksKvStore> {
    Arc::new(RocksKvStore::open(path).unwrap().with_index(RANKING_INDEX))
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 6, day, hour, 0, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, day).unwrap()
}

fn ids(records: &[TrendingRecord]) -> Vec<&str> {
    records.iter().map(|r| r.item_id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lifecycle_on_rocksdb() {
    let path = temp_db_path("lifecycle");
    let store = TrendingStore::new(open(&path));

    let created = store.add("post", "p1", &dec("10.0000000001"), at(1, 10)).await.unwrap();
    assert_eq!(created.score, dec("10"));
    assert!(store.add("post", "p1", &dec("1"), at(1, 10)).await.unwrap_err().is_already_exists());

    let bumped = store
        .increment_score("post", "p1", &dec("2.5"), created.last_deflated_at)
        .await
        .unwrap();
    assert_eq!(bumped.score, dec("12.5"));

    let deflated = store
        .deflate_score("post", "p1", &bumped.score, &dec("6"), date(1), at(2, 9))
        .await
        .unwrap();
    assert_eq!(deflated.score, dec("6"));
    assert_eq!(deflated.last_deflated_at, at(2, 9));

    let stale = store
        .increment_score("post", "p1", &dec("1"), created.last_deflated_at)
        .await
        .unwrap_err();
    assert!(stale.is_not_found_or_stale());

    assert!(store.delete("post", "p1", Some(&dec("7"))).await.unwrap_err().is_not_found_or_stale());
    assert_eq!(store.delete("post", "p1", Some(&dec("6"))).await.unwrap(), Some(deflated));
    assert!(store.get("post", "p1", ReadConsistency::Strong).await.unwrap().is_none());
    assert_eq!(store.delete("post", "p1", None).await.unwrap(), None);

    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn ranking_index_follows_score_changes() {
    let path = temp_db_path("ranking");
    let store = TrendingStore::new(open(&path)).with_page_size(2);

    let a = store.add("post", "a", &dec("5"), at(1, 10)).await.unwrap();
    store.add("post", "b", &dec("3"), at(1, 10)).await.unwrap();
    store.add("post", "c", &dec("4"), at(1, 10)).await.unwrap();
    store.add("user", "u", &dec("0"), at(1, 10)).await.unwrap();

    let records = store.ranked_scan("post").try_collect_all().await.unwrap();
    assert_eq!(ids(&records), vec!["b", "c", "a"]);

    // a drops to the bottom; b climbs to the top; c is removed.
    store
        .deflate_score("post", "a", &a.score, &dec("0.5"), date(1), at(2, 10))
        .await
        .unwrap();
    store
        .increment_score("post", "b", &dec("10"), at(1, 10))
        .await
        .unwrap();
    store.delete("post", "c", None).await.unwrap();

    let records = store.ranked_scan("post").try_collect_all().await.unwrap();
    assert_eq!(ids(&records), vec!["a", "b"]);
    assert_eq!(records[0].score, dec("0.5"));
    assert_eq!(records[1].score, dec("13"));

    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn ranked_scan_orders_mixed_magnitudes_and_ties_across_pages() {
    let path = temp_db_path("magnitudes");
    let store = TrendingStore::new(open(&path)).with_page_size(3);

    let seeded = [
        ("k", "100"),
        ("j", "9.5"),
        ("i", "10"),
        ("h", "0.000000002"),
        ("g", "0"),
        ("f", "10"),
        ("e", "1000000"),
        ("d", "0.45"),
        ("c", "0.5"),
    ];
    for (id, score) in seeded {
        store.add("post", id, &dec(score), at(1, 10)).await.unwrap();
    }

    let mut scan = store.ranked_scan("post");
    let mut records = Vec::new();
    while let Some(record) = scan.next().await.unwrap() {
        records.push(record);
    }
    assert_eq!(ids(&records), vec!["g", "h", "d", "c", "j", "f", "i", "k", "e"]);
    assert_eq!(scan.pages_fetched(), 3);

    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn records_survive_reopen() {
    let path = temp_db_path("reopen");
    let created = {
        let store = TrendingStore::new(open(&path));
        store.add("post", "p1", &dec("2.25"), at(1, 10)).await.unwrap()
    };

    let store = TrendingStore::new(open(&path));
    let fetched = store.get("post", "p1", ReadConsistency::Eventual).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    let records = store.ranked_scan("post").try_collect_all().await.unwrap();
    assert_eq!(ids(&records), vec!["p1"]);

    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn descending_query_walks_backwards() {
    let path = temp_db_path("descending");
    let kv = open(&path);
    let store = TrendingStore::new(kv.clone());
    for (id, score) in [("a", "1"), ("b", "2"), ("c", "3")] {
        store.add("post", id, &dec(score), at(1, 10)).await.unwrap();
    }

    let query = |after| IndexQuery {
        index: RANKING_INDEX,
        partition_value: TrendingRecord::ranking_partition("post"),
        ascending: false,
        limit: Some(2),
        exclusive_start_key: after,
    };
    let pk = |item: &trending_core::Item| PrimaryKey::from_item(item).unwrap().partition_key;

    let first = kv.query_index(&query(None)).await.unwrap();
    assert_eq!(first.items.iter().map(pk).collect::<Vec<_>>(), vec!["post/c", "post/b"]);
    let second = kv.query_index(&query(first.last_evaluated_key)).await.unwrap();
    assert_eq!(second.items.iter().map(pk).collect::<Vec<_>>(), vec!["post/a"]);
    assert!(second.last_evaluated_key.is_none());

    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test]
async fn unregistered_index_is_rejected() {
    let path = temp_db_path("unregistered");
    let kv = RocksKvStore::open(&path).unwrap();
    let query = IndexQuery {
        index: RANKING_INDEX,
        partition_value: "post/trending".into(),
        ascending: true,
        limit: None,
        exclusive_start_key: None,
    };
    assert!(matches!(kv.query_index(&query).await, Err(StoreError::Backend(_))));

    let _ = std::fs::remove_dir_all(&path);
}
