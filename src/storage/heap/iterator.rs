use std::vec;

use crate::buffer::BufferPool;
use crate::common::{PageId, Result, TransactionId};
use crate::concurrency::Permission;
use crate::tuple::Tuple;

use super::HeapFile;

/// Cursor over every tuple of a heap file.
///
/// Pages are fetched shared through the buffer pool one at a time, when the
/// cursor first reaches them, and the locks taken stay with the transaction.
/// The cursor is finite and can be restarted with [`HeapFileIter::rewind`].
/// An error ends the iteration.
pub struct HeapFileIter<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page: u32,
    current: vec::IntoIter<Tuple>,
    done: bool,
}

impl<'a> HeapFileIter<'a> {
    pub(super) fn new(file: &'a HeapFile, pool: &'a BufferPool, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            next_page: 0,
            current: Vec::new().into_iter(),
            done: false,
        }
    }

    /// Starts over from the first page.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.current = Vec::new().into_iter();
        self.done = false;
    }

    /// Drops the cursor. Locks already taken are kept.
    pub fn close(&mut self) {
        self.current = Vec::new().into_iter();
        self.done = true;
    }

    /// Pages to visit: every written page, plus the page past the end when a
    /// transaction has already started filling it in the pool.
    fn page_limit(&self) -> u32 {
        let num_pages = self.file.num_pages();
        let pending = PageId::new(self.file.id(), num_pages);
        if self.pool.is_cached(pending) {
            num_pages + 1
        } else {
            num_pages
        }
    }

    fn load_page(&mut self, page_id: PageId) -> Result<()> {
        let page = self.pool.get_page(self.tid, page_id, Permission::ReadOnly)?;
        let tuples: Vec<Tuple> = page.read().iter().cloned().collect();
        self.current = tuples.into_iter();
        Ok(())
    }
}

impl Iterator for HeapFileIter<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.current.next() {
                return Some(Ok(tuple));
            }
            if self.done || self.next_page >= self.page_limit() {
                return None;
            }

            let page_id = PageId::new(self.file.id(), self.next_page);
            self.next_page += 1;
            if let Err(e) = self.load_page(page_id) {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
