use std::sync::{atomic::Ordering, Arc};

use super::*;
use crate::tests::helpers::{cache_variants, edge, init_logging, vertex, FlakyStore};

#[test]
fn test_miss_is_not_an_error_and_false_is_distinct() {
    init_logging();
    for (label, cache) in cache_variants() {
        let query = edge("a", "b");
        assert_eq!(cache.get(&query).unwrap(), None, "{label}");
        cache.set(&query, false).unwrap();
        assert_eq!(cache.get(&query).unwrap(), Some(false), "{label}");
        cache.set(&query, true).unwrap();
        assert_eq!(cache.get(&query).unwrap(), Some(true), "{label}");
        assert_eq!(cache.size().unwrap(), 1, "{label}");
    }
}

#[test]
fn test_delete_by_prefix_only_touches_matching_start() {
    init_logging();
    for (label, cache) in cache_variants() {
        cache.set(&edge("a", "b"), true).unwrap();
        cache.set(&edge("a", "c"), false).unwrap();
        cache.set(&edge("ab", "c"), true).unwrap();
        cache.set(&edge("b", "a"), false).unwrap();

        cache.delete_by_prefix(&vertex("a")).unwrap();

        assert_eq!(cache.get(&edge("a", "b")).unwrap(), None, "{label}");
        assert_eq!(cache.get(&edge("a", "c")).unwrap(), None, "{label}");
        // "ab" shares a textual prefix with "a" but is a different start vertex
        assert_eq!(cache.get(&edge("ab", "c")).unwrap(), Some(true), "{label}");
        assert_eq!(cache.get(&edge("b", "a")).unwrap(), Some(false), "{label}");
        assert_eq!(cache.size().unwrap(), 2, "{label}");
    }
}

#[test]
fn test_delete_and_clear() {
    init_logging();
    for (label, cache) in cache_variants() {
        cache.set(&edge("a", "b"), true).unwrap();
        cache.set(&edge("c", "d"), true).unwrap();

        cache.delete(&edge("a", "b"));
        cache.delete(&edge("x", "y"));
        assert_eq!(cache.get(&edge("a", "b")).unwrap(), None, "{label}");
        assert_eq!(cache.size().unwrap(), 1, "{label}");

        cache.clear().unwrap();
        assert_eq!(cache.size().unwrap(), 0, "{label}");
        assert_eq!(cache.get(&edge("c", "d")).unwrap(), None, "{label}");
    }
}

#[test]
fn test_key_value_cache_key_layout() {
    let store = Arc::new(MemoryKeyValueStore::default());
    let cache = KeyValueCache::new(store.clone(), "e");
    cache.set(&edge("a", "b"), true).unwrap();
    cache.set(&edge("a", "c"), false).unwrap();

    assert_eq!(store.get("e:a:b").unwrap().as_deref(), Some("1"));
    assert_eq!(store.get("e:a:c").unwrap().as_deref(), Some("0"));
    assert_eq!(store.scan("e:a:").unwrap(), vec!["e:a:b", "e:a:c"]);
}

#[test]
fn test_key_value_cache_prefixes_are_isolated() {
    let store: Arc<MemoryKeyValueStore> = Arc::new(MemoryKeyValueStore::default());
    let first = KeyValueCache::new(store.clone(), "e");
    let second = KeyValueCache::new(store.clone(), "other");
    first.set(&edge("a", "b"), true).unwrap();
    second.set(&edge("a", "b"), false).unwrap();
    store.set("unrelated", "x").unwrap();

    first.clear().unwrap();

    assert_eq!(first.size().unwrap(), 0);
    assert_eq!(second.get(&edge("a", "b")).unwrap(), Some(false));
    assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("x"));
}

#[test]
fn test_key_value_cache_rejects_unexpected_values() {
    let store = Arc::new(MemoryKeyValueStore::default());
    let cache = KeyValueCache::new(store.clone(), "e");
    store.set("e:a:b", "maybe").unwrap();
    assert!(matches!(
        cache.get(&edge("a", "b")),
        Err(HierarchyError::Cache(_))
    ));
}

#[test]
fn test_key_value_cache_set_retries_once() {
    init_logging();
    let store = Arc::new(FlakyStore::default());
    let cache = KeyValueCache::new(store.clone(), "e");

    store.failing_sets.store(1, Ordering::SeqCst);
    cache.set(&edge("a", "b"), true).unwrap();
    assert_eq!(store.ops("set"), 2);
    assert_eq!(cache.get(&edge("a", "b")).unwrap(), Some(true));

    store.failing_sets.store(2, Ordering::SeqCst);
    let result = cache.set(&edge("a", "c"), true);
    assert!(matches!(result, Err(HierarchyError::Cache(_))));
    assert_eq!(store.ops("set"), 4);
    assert_eq!(cache.get(&edge("a", "c")).unwrap(), None);
}

#[test]
fn test_key_value_cache_surfaces_store_errors() {
    init_logging();
    let store = Arc::new(FlakyStore::default());
    let cache = KeyValueCache::new(store.clone(), "e");
    cache.set(&edge("a", "b"), true).unwrap();

    store.failing_gets.store(1, Ordering::SeqCst);
    assert!(cache.get(&edge("a", "b")).is_err());
    assert_eq!(cache.get(&edge("a", "b")).unwrap(), Some(true));

    store.failing_scans.store(1, Ordering::SeqCst);
    let err = cache.delete_by_prefix(&vertex("a")).unwrap_err();
    assert!(err.is_backend());
    assert_eq!(cache.get(&edge("a", "b")).unwrap(), Some(true));
}

#[test]
fn test_key_value_cache_delete_retries_and_never_fails() {
    init_logging();
    let store = Arc::new(FlakyStore::default());
    let cache = KeyValueCache::new(store.clone(), "e");
    cache.set(&edge("a", "b"), true).unwrap();
    cache.set(&edge("a", "c"), true).unwrap();

    store.failing_deletes.store(1, Ordering::SeqCst);
    cache.delete(&edge("a", "b"));
    assert_eq!(store.ops("delete"), 2);
    assert_eq!(cache.get(&edge("a", "b")).unwrap(), None);

    store.failing_deletes.store(2, Ordering::SeqCst);
    cache.delete(&edge("a", "c"));
    assert_eq!(cache.get(&edge("a", "c")).unwrap(), Some(true));
}

#[test]
fn test_memory_store_scan_is_prefix_bounded() {
    let store = MemoryKeyValueStore::default();
    for key in ["e:a:b", "e:a:c", "e:aa:b", "e:b:a", "f:a:b"] {
        store.set(key, "1").unwrap();
    }
    assert_eq!(store.scan("e:a:").unwrap(), vec!["e:a:b", "e:a:c"]);
    assert_eq!(store.size("e:").unwrap(), 4);
    assert_eq!(store.delete_by_prefix("e:a").unwrap(), 3);
    assert_eq!(store.scan("").unwrap(), vec!["e:b:a", "f:a:b"]);
}
