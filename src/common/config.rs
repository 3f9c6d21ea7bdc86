use std::time::Duration;

use super::{Result, TarnError};
use crate::storage::page::HeapPage;

/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool size (number of cached pages)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 50;

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRUK_K: usize = 2;

/// How long a lock request may wait before its transaction is aborted
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(200);

/// Slots a page may hold: one more than the largest `SlotId`
pub const MAX_SLOTS_PER_PAGE: usize = u16::MAX as usize + 1;

/// Process-wide storage settings.
///
/// Fixed when the buffer pool is built and shared by every heap file and
/// transaction that goes through it. Changing them means restarting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Size of every page, in memory and on disk
    pub page_size: usize,
    /// Maximum number of pages held by the buffer pool
    pub pool_size: usize,
    /// Upper bound on a single lock acquisition
    pub lock_timeout: Duration,
    /// K for the LRU-K replacer
    pub replacer_k: usize,
}

impl StorageConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_replacer_k(mut self, k: usize) -> Self {
        self.replacer_k = k;
        self
    }

    /// Rejects settings the storage layer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(TarnError::InvalidArgument("page size must be positive".into()));
        }
        // One-byte tuples give the most slots a page of this size can have
        let densest = HeapPage::max_slots(self.page_size, 1);
        if densest > MAX_SLOTS_PER_PAGE {
            return Err(TarnError::InvalidArgument(format!(
                "page size {} allows {} slots, more than {} are addressable",
                self.page_size, densest, MAX_SLOTS_PER_PAGE
            )));
        }
        if self.pool_size == 0 {
            return Err(TarnError::InvalidArgument("pool size must be positive".into()));
        }
        if self.replacer_k == 0 {
            return Err(TarnError::InvalidArgument("replacer k must be positive".into()));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pool_size: DEFAULT_BUFFER_POOL_SIZE,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            replacer_k: DEFAULT_LRUK_K,
        }
    }
}
