use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::common::{PageId, Result, StorageConfig, TableId, TarnError, TransactionId};
use crate::concurrency::{LockManager, Permission};
use crate::storage::heap::HeapFile;
use crate::storage::page::HeapPage;
use crate::tuple::{Schema, Tuple};

use super::LruKReplacer;

/// Shared handle to a cached page.
///
/// Holding a clone keeps the page pinned: the pool never evicts a page that is
/// referenced outside its own table.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// The bounded page cache every page access goes through.
///
/// `get_page` takes the page lock for the transaction before handing the page
/// out, so callers only touch pages they are allowed to. Dirty pages stay
/// cached until their transaction ends (no-steal): commit writes them back,
/// abort re-reads the old image from disk. Eviction picks among clean,
/// unpinned pages by LRU-K.
pub struct BufferPool {
    config: StorageConfig,
    lock_manager: LockManager,
    /// Heap files the pool can fetch pages from, by table
    files: RwLock<HashMap<TableId, Arc<HeapFile>>>,
    /// Cached pages; at most one copy per page id
    pages: Mutex<HashMap<PageId, PageRef>>,
    replacer: LruKReplacer,
}

impl BufferPool {
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lock_manager: LockManager::new(config.lock_timeout),
            replacer: LruKReplacer::new(config.replacer_k),
            files: RwLock::new(HashMap::new()),
            pages: Mutex::new(HashMap::new()),
            config,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.config.pool_size
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    /// Makes the pages of `file` reachable through the pool.
    pub fn register_file(&self, file: Arc<HeapFile>) -> TableId {
        let table_id = file.id();
        self.files.write().insert(table_id, file);
        table_id
    }

    /// Opens a heap file with the pool's page size and registers it.
    pub fn open_file<P: AsRef<Path>>(&self, path: P, schema: Arc<Schema>) -> Result<Arc<HeapFile>> {
        let file = Arc::new(HeapFile::open(path, schema, &self.config)?);
        self.register_file(Arc::clone(&file));
        Ok(file)
    }

    pub fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.files
            .read()
            .get(&table_id)
            .cloned()
            .ok_or(TarnError::UnknownTable(table_id))
    }

    /// Locks `page_id` for `tid` and returns the cached page, reading it from
    /// its file first if needed.
    ///
    /// May block on the lock, and fails with `TransactionAborted` when the
    /// lock cannot be granted. Fails with `BufferPoolFull` when the page must
    /// be read but every cached page is dirty or pinned.
    pub fn get_page(&self, tid: TransactionId, page_id: PageId, permission: Permission) -> Result<PageRef> {
        self.lock_manager.acquire(tid, page_id, permission.into())?;

        let mut pages = self.pages.lock();
        if let Some(page) = pages.get(&page_id) {
            let page = Arc::clone(page);
            self.replacer.record_access(page_id);
            return Ok(page);
        }

        let file = self.file(page_id.table_id)?;
        if pages.len() >= self.config.pool_size {
            self.evict_page(&mut pages)?;
        }

        let page: PageRef = Arc::new(RwLock::new(file.read_page(page_id)?));
        pages.insert(page_id, Arc::clone(&page));
        self.replacer.record_access(page_id);
        tracing::debug!(tid = %tid, page = %page_id, ?permission, "fetched page");

        Ok(page)
    }

    fn is_evictable(page: &PageRef) -> bool {
        // The map's own reference is the only one: nobody is using the page.
        Arc::strong_count(page) == 1 && page.try_read().is_some_and(|p| !p.is_dirty())
    }

    fn evict_page(&self, pages: &mut HashMap<PageId, PageRef>) -> Result<()> {
        for (page_id, page) in pages.iter() {
            self.replacer.set_evictable(*page_id, Self::is_evictable(page));
        }

        let victim = self.replacer.evict().ok_or(TarnError::BufferPoolFull)?;
        pages.remove(&victim);
        tracing::debug!(page = %victim, "evicted page");
        Ok(())
    }

    /// Inserts `tuple` into table `table_id` on behalf of `tid`.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: &mut Tuple) -> Result<()> {
        let file = self.file(table_id)?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.mark_dirty(&dirtied, tid);
        Ok(())
    }

    /// Deletes `tuple` from the table its record id points into.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &mut Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(TarnError::UnplacedTuple)?;
        let file = self.file(record_id.page_id.table_id)?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.mark_dirty(&dirtied, tid);
        Ok(())
    }

    fn mark_dirty(&self, page_ids: &[PageId], tid: TransactionId) {
        for page_id in page_ids {
            let page = self.pages.lock().get(page_id).cloned();
            if let Some(page) = page {
                page.write().mark_dirty(true, Some(tid));
            }
        }
    }

    /// Writes page `page_id` back to its file if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let page = self
            .pages
            .lock()
            .get(&page_id)
            .cloned()
            .ok_or(TarnError::PageNotCached(page_id))?;
        self.flush(&page)
    }

    /// Writes every dirty cached page back, whoever dirtied it.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<PageRef> = self.pages.lock().values().cloned().collect();
        for page in &pages {
            self.flush(page)?;
        }
        Ok(())
    }

    fn flush(&self, page: &PageRef) -> Result<()> {
        let mut page = page.write();
        if !page.is_dirty() {
            return Ok(());
        }

        let file = self.file(page.page_id().table_id)?;
        file.write_page(&page)?;
        page.mark_dirty(false, None);
        tracing::debug!(page = %page.page_id(), "flushed page");
        Ok(())
    }

    /// Drops a page from the cache without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        if self.pages.lock().remove(&page_id).is_some() {
            self.replacer.remove(page_id);
            tracing::debug!(page = %page_id, "discarded page");
        }
    }

    /// Cached pages last dirtied by `tid`.
    fn dirtied_by(&self, tid: TransactionId) -> Vec<PageRef> {
        let pages: Vec<PageRef> = self.pages.lock().values().cloned().collect();
        pages
            .into_iter()
            .filter(|page| page.read().dirtier() == Some(tid))
            .collect()
    }

    /// Makes the changes of `tid` durable and releases its locks.
    ///
    /// The locks are released even when a write fails. A page that could not
    /// be written is dropped from the cache and the first error is returned.
    pub fn commit(&self, tid: TransactionId) -> Result<()> {
        let dirtied = self.dirtied_by(tid);
        let mut first_error = None;
        for page in &dirtied {
            if let Err(e) = self.flush(page) {
                let page_id = page.read().page_id();
                tracing::warn!(tid = %tid, page = %page_id, error = %e, "commit flush failed");
                self.discard_page(page_id);
                first_error.get_or_insert(e);
            }
        }
        self.lock_manager.release_all(tid);
        tracing::info!(tid = %tid, pages = dirtied.len(), "transaction committed");
        first_error.map_or(Ok(()), Err)
    }

    /// Reverts every page `tid` dirtied to its on-disk image and releases its
    /// locks.
    ///
    /// The locks are released even when a re-read fails. A page that could not
    /// be restored is dropped from the cache and the first error is returned.
    pub fn abort(&self, tid: TransactionId) -> Result<()> {
        let dirtied = self.dirtied_by(tid);
        let mut first_error = None;
        for page in &dirtied {
            if let Err(e) = self.revert(page) {
                first_error.get_or_insert(e);
            }
        }
        self.lock_manager.release_all(tid);
        tracing::info!(tid = %tid, pages = dirtied.len(), "transaction aborted");
        first_error.map_or(Ok(()), Err)
    }

    fn revert(&self, page: &PageRef) -> Result<()> {
        let mut guard = page.write();
        let page_id = guard.page_id();
        match self.file(page_id.table_id).and_then(|file| file.read_page(page_id)) {
            Ok(restored) => {
                *guard = restored;
                Ok(())
            }
            Err(e) => {
                drop(guard);
                tracing::warn!(page = %page_id, error = %e, "abort could not restore page");
                self.discard_page(page_id);
                Err(e)
            }
        }
    }

    /// Ends `tid`, committing or aborting it.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.commit(tid)
        } else {
            self.abort(tid)
        }
    }

    /// Gives up `tid`'s lock on one page before the transaction ends.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) {
        self.lock_manager.release(tid, page_id);
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds_lock(tid, page_id)
    }
}
