use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::PageId;

/// Logical clock tick, advanced on every recorded access
type Timestamp = u64;

/// Access history of one cached page
#[derive(Debug, Default)]
struct AccessHistory {
    /// Last k access times, most recent at back
    history: VecDeque<Timestamp>,
    is_evictable: bool,
}

impl AccessHistory {
    fn record(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Eviction rank; the largest rank goes first.
    ///
    /// Pages seen fewer than k times have +inf backward k-distance and outrank
    /// every other page, oldest first access first. The rest are ordered by
    /// backward k-distance.
    fn rank(&self, now: Timestamp, k: usize) -> (bool, Timestamp) {
        let oldest = self.history.front().copied().unwrap_or(0);
        if self.history.len() < k {
            (true, Timestamp::MAX - oldest)
        } else {
            (false, now - oldest)
        }
    }
}

#[derive(Debug, Default)]
struct ReplacerState {
    clock: Timestamp,
    pages: HashMap<PageId, AccessHistory>,
    num_evictable: usize,
}

/// LRU-K replacement policy over cached pages.
///
/// The buffer pool decides which pages may go (clean and unpinned) and reports
/// that through [`LruKReplacer::set_evictable`]; the replacer only ranks them.
pub struct LruKReplacer {
    k: usize,
    state: Mutex<ReplacerState>,
}

impl LruKReplacer {
    /// Creates a new LRU-K replacer with the given k value.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            state: Mutex::new(ReplacerState::default()),
        }
    }

    /// Picks and forgets the evictable page with the largest backward
    /// k-distance. Returns None if no page is evictable.
    pub fn evict(&self) -> Option<PageId> {
        let mut state = self.state.lock();
        let now = state.clock;

        let victim = state
            .pages
            .iter()
            .filter(|(_, h)| h.is_evictable)
            .max_by_key(|(_, h)| h.rank(now, self.k))
            .map(|(page_id, _)| *page_id)?;

        state.pages.remove(&victim);
        state.num_evictable -= 1;
        Some(victim)
    }

    /// Records an access to `page_id` at the current time.
    pub fn record_access(&self, page_id: PageId) {
        let mut state = self.state.lock();
        let now = state.clock;
        state.clock += 1;
        state.pages.entry(page_id).or_default().record(now, self.k);
    }

    /// Sets whether a page may be chosen by `evict`.
    pub fn set_evictable(&self, page_id: PageId, is_evictable: bool) {
        let mut state = self.state.lock();
        let history = state.pages.entry(page_id).or_default();
        if history.is_evictable == is_evictable {
            return;
        }
        history.is_evictable = is_evictable;
        if is_evictable {
            state.num_evictable += 1;
        } else {
            state.num_evictable -= 1;
        }
    }

    /// Forgets a page that left the pool other than through `evict`.
    pub fn remove(&self, page_id: PageId) {
        let mut state = self.state.lock();
        if let Some(history) = state.pages.remove(&page_id) {
            if history.is_evictable {
                state.num_evictable -= 1;
            }
        }
    }

    /// Returns the number of evictable pages.
    pub fn size(&self) -> usize {
        self.state.lock().num_evictable
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn page(n: u32) -> PageId {
        PageId::new(TableId::new(3), n)
    }

    #[test]
    fn test_evict_empty() {
        let replacer = LruKReplacer::new(2);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_infinite_distance_evicted_first() {
        let replacer = LruKReplacer::new(2);

        replacer.record_access(page(0));
        replacer.record_access(page(0));
        replacer.record_access(page(1));
        replacer.set_evictable(page(0), true);
        replacer.set_evictable(page(1), true);

        // Page 1 has a single access, so +inf distance
        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), Some(page(0)));
    }

    #[test]
    fn test_oldest_infinite_first() {
        let replacer = LruKReplacer::new(2);
        for n in 0..3 {
            replacer.record_access(page(n));
            replacer.set_evictable(page(n), true);
        }
        assert_eq!(replacer.evict(), Some(page(0)));
        assert_eq!(replacer.size(), 2);
    }

    #[test]
    fn test_not_evictable_is_skipped() {
        let replacer = LruKReplacer::new(2);
        replacer.record_access(page(0));
        replacer.record_access(page(1));
        replacer.set_evictable(page(1), true);

        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), None);

        replacer.set_evictable(page(0), true);
        replacer.set_evictable(page(0), false);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_remove() {
        let replacer = LruKReplacer::new(2);
        replacer.record_access(page(0));
        replacer.set_evictable(page(0), true);
        replacer.remove(page(0));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }
}
