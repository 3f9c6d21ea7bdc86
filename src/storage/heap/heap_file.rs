use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Result, StorageConfig, TableId, TarnError, TransactionId};
use crate::concurrency::Permission;
use crate::storage::disk::DiskManager;
use crate::storage::page::HeapPage;
use crate::tuple::{Schema, Tuple};

use super::HeapFileIter;

/// An unordered collection of same-schema tuples stored as a run of heap pages.
///
/// The file only does disk I/O. Tuple-level operations take the buffer pool
/// that fronts the file and go through it for every page they touch, so the
/// pool's locking and caching apply. Pages are never removed; the file only
/// grows, one page at a time, when a page at or past the end is written.
pub struct HeapFile {
    table_id: TableId,
    schema: Arc<Schema>,
    disk: DiskManager,
}

impl HeapFile {
    /// Opens (creating if missing) the heap file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, schema: Arc<Schema>, config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let disk = DiskManager::new(path.as_ref(), config.page_size)?;
        let table_id = TableId::from_path(path.as_ref());

        tracing::debug!(
            table = %table_id,
            path = %path.as_ref().display(),
            pages = disk.num_pages(),
            "opened heap file"
        );

        Ok(Self {
            table_id,
            schema,
            disk,
        })
    }

    pub fn id(&self) -> TableId {
        self.table_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        self.disk.path()
    }

    pub fn page_size(&self) -> usize {
        self.disk.page_size()
    }

    /// Number of pages written to the file so far.
    pub fn num_pages(&self) -> u32 {
        self.disk.num_pages()
    }

    /// Reads a page straight from disk, bypassing the buffer pool.
    ///
    /// Asking for the page one past the end returns a fresh empty page; the
    /// file itself grows only once that page is written.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        if page_id.table_id != self.table_id {
            return Err(TarnError::InvalidArgument(format!(
                "{} does not belong to {}",
                page_id, self.table_id
            )));
        }

        let num_pages = self.num_pages();
        if page_id.page_no > num_pages {
            return Err(TarnError::InvalidPageNumber {
                page_no: page_id.page_no,
                num_pages,
            });
        }

        let page_size = self.page_size();
        if page_id.page_no == num_pages {
            return Ok(HeapPage::empty(page_id, self.schema.clone(), page_size));
        }

        let mut data = vec![0u8; page_size];
        self.disk.read_page(page_id.page_no, &mut data)?;
        HeapPage::from_bytes(page_id, self.schema.clone(), &data, page_size)
    }

    /// Writes the full image of `page` at its offset.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let page_id = page.page_id();
        if page_id.table_id != self.table_id {
            return Err(TarnError::InvalidArgument(format!(
                "{} does not belong to {}",
                page_id, self.table_id
            )));
        }
        self.disk.write_page(page_id.page_no, &page.page_data())
    }

    /// Inserts `tuple` into the first page with a free slot, appending a page
    /// when all are full. Returns the pages it modified.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageId>> {
        if **tuple.schema() != *self.schema {
            return Err(TarnError::SchemaMismatch);
        }
        if HeapPage::max_slots(self.page_size(), self.schema.size()) == 0 {
            return Err(TarnError::InvalidArgument(format!(
                "a {} byte tuple does not fit in a {} byte page",
                self.schema.size(),
                self.page_size()
            )));
        }

        let mut page_no = 0;
        loop {
            let num_pages = self.num_pages();
            if page_no > num_pages {
                // The page at the end is a full, unwritten page held in the
                // pool. Reserve its slot on disk with an empty image so the
                // file can grow past it; aborting still restores an empty page.
                let reserved = PageId::new(self.table_id, num_pages);
                self.write_page(&HeapPage::empty(reserved, self.schema.clone(), self.page_size()))?;
                continue;
            }

            let page_id = PageId::new(self.table_id, page_no);
            let page = pool.get_page(tid, page_id, Permission::ReadWrite)?;
            let mut page = page.write();
            if page.num_empty_slots() > 0 {
                page.insert_tuple(tuple)?;
                page.mark_dirty(true, Some(tid));
                tracing::debug!(tid = %tid, page = %page_id, "inserted tuple");
                return Ok(vec![page_id]);
            }

            page_no += 1;
        }
    }

    /// Removes `tuple` from the page its record id names. Returns that page.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageId>> {
        let record_id = tuple.record_id().ok_or(TarnError::UnplacedTuple)?;
        if record_id.page_id.table_id != self.table_id {
            return Err(TarnError::TupleNotInTable {
                record_id,
                table_id: self.table_id,
            });
        }
        let page_id = record_id.page_id;

        let page = pool.get_page(tid, page_id, Permission::ReadWrite)?;
        let mut page = page.write();
        page.delete_tuple(tuple)?;
        page.mark_dirty(true, Some(tid));
        tracing::debug!(tid = %tid, page = %page_id, "deleted tuple");

        Ok(vec![page_id])
    }

    /// Iterates every tuple of the file, in page then slot order, as seen by
    /// `tid`. Each page is locked shared through `pool` on first touch.
    pub fn iter<'a>(&'a self, pool: &'a BufferPool, tid: TransactionId) -> HeapFileIter<'a> {
        HeapFileIter::new(self, pool, tid)
    }
}
