use std::fmt;

use thiserror::Error;

use super::types::{PageId, RecordId, TableId, TransactionId};

/// Why the lock manager gave up on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The wait-for graph contained a cycle through the requester
    Deadlock,
    /// The request was not granted within the lock timeout
    Timeout,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Deadlock => write!(f, "deadlock"),
            AbortReason::Timeout => write!(f, "lock timeout"),
        }
    }
}

/// Database error types
#[derive(Error, Debug)]
pub enum TarnError {
    // Format errors: the bytes of a page cannot be decoded.
    #[error("Malformed page {page_id}: {reason}")]
    MalformedPage { page_id: PageId, reason: String },

    #[error("Corrupt tuple in slot {slot} of page {page_id}")]
    CorruptTuple { page_id: PageId, slot: usize },

    // Storage errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tuple schema does not match the schema of the target")]
    SchemaMismatch,

    #[error("Page {0} has no free slot")]
    PageFull(PageId),

    #[error("Tuple {record_id:?} does not live on page {page_id}")]
    TupleNotOnPage {
        record_id: Option<RecordId>,
        page_id: PageId,
    },

    #[error("Tuple is not stored in any table")]
    UnplacedTuple,

    #[error("Tuple at {record_id:?} does not belong to table {table_id}")]
    TupleNotInTable {
        record_id: RecordId,
        table_id: TableId,
    },

    #[error("Slot {slot} of page {page_id} is empty")]
    EmptySlot { page_id: PageId, slot: usize },

    #[error("Buffer pool is full, no evictable pages available")]
    BufferPoolFull,

    #[error("Table {0} is not registered with the buffer pool")]
    UnknownTable(TableId),

    #[error("Page {0} is not in the buffer pool")]
    PageNotCached(PageId),

    // Raised by the lock manager; the transaction must be aborted.
    #[error("Transaction {tid} aborted: {reason}")]
    TransactionAborted {
        tid: TransactionId,
        reason: AbortReason,
    },

    // Argument errors: caller bugs, never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid page number {page_no} (file has {num_pages} pages)")]
    InvalidPageNumber { page_no: u32, num_pages: u32 },

    #[error("Field index {index} out of range for schema with {len} fields")]
    FieldIndexOutOfRange { index: usize, len: usize },
}

impl TarnError {
    /// Returns true for the only error callers are expected to retry, by aborting
    /// and restarting the transaction under a fresh id.
    pub fn is_transaction_aborted(&self) -> bool {
        matches!(self, TarnError::TransactionAborted { .. })
    }
}

pub type Result<T> = std::result::Result<T, TarnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_detection() {
        let err = TarnError::TransactionAborted {
            tid: TransactionId::from_raw(7),
            reason: AbortReason::Deadlock,
        };
        assert!(err.is_transaction_aborted());
        assert_eq!(err.to_string(), "Transaction Txn(7) aborted: deadlock");

        assert!(!TarnError::BufferPoolFull.is_transaction_aborted());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: TarnError = io.into();
        assert!(matches!(err, TarnError::Io(_)));
    }
}
