use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Table identifier - one per heap file, derived from the file's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Derives a table id from the absolute path of the backing file.
    ///
    /// The same path always hashes to the same id, across processes too, and
    /// distinct paths collide only with CRC32 probability.
    pub fn from_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self(crc32fast::hash(absolute.to_string_lossy().as_bytes()))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Page identifier type - a page number within one table's heap file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({}:{})", self.table_id.0, self.page_no)
    }
}

/// Slot identifier within a heap page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u16);

impl SlotId {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Record identifier - combination of page ID and slot ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Transaction identifier. Every call to `new` hands out a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an existing raw id. Does not advance the generator.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_equality() {
        let a = PageId::new(TableId::new(1), 3);
        let b = PageId::new(TableId::new(1), 3);
        let c = PageId::new(TableId::new(2), 3);
        let d = PageId::new(TableId::new(1), 4);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.to_string(), "PageId(1:3)");
    }

    #[test]
    fn test_record_id_equality() {
        let pid = PageId::new(TableId::new(1), 0);
        assert_eq!(RecordId::new(pid, SlotId::new(2)), RecordId::new(pid, SlotId::new(2)));
        assert_ne!(RecordId::new(pid, SlotId::new(2)), RecordId::new(pid, SlotId::new(3)));
    }

    #[test]
    fn test_table_id_from_path_is_stable() {
        let a = TableId::from_path(Path::new("/tmp/tarn/a.dat"));
        let b = TableId::from_path(Path::new("/tmp/tarn/a.dat"));
        let c = TableId::from_path(Path::new("/tmp/tarn/b.dat"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
