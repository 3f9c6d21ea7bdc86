//! Tarn - a heap-file storage engine with page-level two-phase locking
//!
//! This crate provides the storage and transaction core of a single-node
//! relational engine: fixed-schema tuples stored in slotted heap pages, heap
//! files of such pages on disk, a bounded buffer pool that caches pages, and a
//! lock manager that arbitrates page access between concurrent transactions.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Tuples** (`tuple`): Fixed-width schemas, typed values and tuples
//!
//! - **Storage Layer** (`storage`): Handles disk I/O and page organization
//!   - `DiskManager`: Reads and writes fixed-size pages of one file
//!   - `HeapPage`: Occupancy bitmap followed by fixed-width tuple slots
//!   - `HeapFile`: A table's pages on disk, with tuple insert/delete/scan
//!
//! - **Concurrency** (`concurrency`): Strict two-phase locking at page granularity
//!   - `LockManager`: Shared/exclusive locks, upgrades, deadlock detection, timeouts
//!
//! - **Buffer Pool** (`buffer`): Memory management for heap pages
//!   - `BufferPool`: Locks, caches and evicts pages; commits and aborts transactions
//!   - `LruKReplacer`: LRU-K page replacement policy
//!
//! The buffer pool never evicts a dirty page. A transaction's changes stay in
//! memory until it commits, when they are written back, or aborts, when the
//! pages are re-read from disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tarn::buffer::BufferPool;
//! use tarn::common::{StorageConfig, TransactionId};
//! use tarn::tuple::{DataType, Schema, Tuple, Value};
//!
//! let pool = BufferPool::new(StorageConfig::default()).unwrap();
//! let schema = Schema::builder()
//!     .field("id", DataType::Integer)
//!     .build_arc()
//!     .unwrap();
//! let table = pool.open_file("people.dat", schema.clone()).unwrap();
//!
//! let tid = TransactionId::new();
//! let mut tuple = Tuple::new(schema, vec![Value::Integer(1)]).unwrap();
//! pool.insert_tuple(tid, table.id(), &mut tuple).unwrap();
//! pool.commit(tid).unwrap();
//!
//! let reader = TransactionId::new();
//! for tuple in table.iter(&pool, reader) {
//!     println!("{}", tuple.unwrap());
//! }
//! pool.commit(reader).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{PageId, RecordId, Result, SlotId, TableId, TarnError, TransactionId};
