//! Integration tests for the LRU-K replacer

use tarn::buffer::LruKReplacer;
use tarn::common::{PageId, TableId};

fn page(n: u32) -> PageId {
    PageId::new(TableId::new(1), n)
}

#[test]
fn test_lru_k_eviction_order() {
    let replacer = LruKReplacer::new(2);

    for i in 0..5 {
        replacer.record_access(page(i));
        replacer.set_evictable(page(i), true);
    }
    assert_eq!(replacer.size(), 5);

    // One access each (< k), so oldest first
    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(page(i)));
    }
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_largest_k_distance() {
    let replacer = LruKReplacer::new(2);

    // Pages accessed twice each, in order 0, 1, 2
    for i in 0..3 {
        replacer.record_access(page(i));
        replacer.record_access(page(i));
        replacer.set_evictable(page(i), true);
    }

    // Two fresh accesses make page 0 the most recently used
    replacer.record_access(page(0));
    replacer.record_access(page(0));

    assert_eq!(replacer.evict(), Some(page(1)));
    assert_eq!(replacer.evict(), Some(page(2)));
    assert_eq!(replacer.evict(), Some(page(0)));
}

#[test]
fn test_lru_k_pages_of_different_tables() {
    let replacer = LruKReplacer::new(1);
    let a = PageId::new(TableId::new(1), 0);
    let b = PageId::new(TableId::new(2), 0);

    replacer.record_access(a);
    replacer.record_access(b);
    replacer.set_evictable(a, true);
    replacer.set_evictable(b, true);

    // k = 1 is plain LRU
    replacer.record_access(a);
    assert_eq!(replacer.evict(), Some(b));
    assert_eq!(replacer.evict(), Some(a));
}
