//! Integration tests for heap files

use std::sync::Arc;

use tarn::buffer::BufferPool;
use tarn::common::{PageId, RecordId, SlotId, StorageConfig, TableId, TarnError, TransactionId};
use tarn::storage::heap::HeapFile;
use tarn::tuple::{DataType, Schema, Tuple, Value};
use tempfile::NamedTempFile;

/// 16-byte pages of one integer: three tuples per page.
fn create_pool(pool_size: usize) -> BufferPool {
    let config = StorageConfig::default()
        .with_page_size(16)
        .with_pool_size(pool_size);
    BufferPool::new(config).unwrap()
}

fn int_schema() -> Arc<Schema> {
    Arc::new(Schema::from_types(&[DataType::Integer]).unwrap())
}

fn int_tuple(schema: &Arc<Schema>, v: i32) -> Tuple {
    Tuple::new(schema.clone(), vec![Value::Integer(v)]).unwrap()
}

fn scan(pool: &BufferPool, file: &HeapFile) -> Vec<i32> {
    let tid = TransactionId::new();
    let values = file
        .iter(pool, tid)
        .map(|t| match t.unwrap().value(0) {
            Some(Value::Integer(v)) => *v,
            other => panic!("unexpected value {:?}", other),
        })
        .collect();
    pool.commit(tid).unwrap();
    values
}

#[test]
fn test_end_to_end_insert_iterate_delete() {
    let temp = NamedTempFile::new().unwrap();
    let schema = int_schema();

    {
        let pool = create_pool(10);
        let file = pool.open_file(temp.path(), schema.clone()).unwrap();
        let tid = TransactionId::new();
        for v in 1..=4 {
            pool.insert_tuple(tid, file.id(), &mut int_tuple(&schema, v)).unwrap();
        }
        pool.commit(tid).unwrap();
    }

    // Re-open from disk
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), schema.clone()).unwrap();
    assert_eq!(file.num_pages(), 2);
    assert_eq!(scan(&pool, &file), vec![1, 2, 3, 4]);

    let page0 = file.read_page(PageId::new(file.id(), 0)).unwrap();
    let page1 = file.read_page(PageId::new(file.id(), 1)).unwrap();
    assert_eq!(page0.iter().count(), 3);
    assert_eq!(page1.iter().count(), 1);

    // Delete the row holding 2
    let tid = TransactionId::new();
    let mut two = file
        .iter(&pool, tid)
        .map(Result::unwrap)
        .find(|t| t.value(0) == Some(&Value::Integer(2)))
        .unwrap();
    pool.delete_tuple(tid, &mut two).unwrap();
    pool.commit(tid).unwrap();

    assert_eq!(scan(&pool, &file), vec![1, 3, 4]);
}

#[test]
fn test_insert_fills_first_free_slot() {
    let temp = NamedTempFile::new().unwrap();
    let schema = int_schema();
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), schema.clone()).unwrap();

    let tid = TransactionId::new();
    let mut tuples: Vec<Tuple> = (0..6).map(|v| int_tuple(&schema, v)).collect();
    for tuple in tuples.iter_mut() {
        pool.insert_tuple(tid, file.id(), tuple).unwrap();
    }
    pool.delete_tuple(tid, &mut tuples[1]).unwrap();

    let mut again = int_tuple(&schema, 99);
    pool.insert_tuple(tid, file.id(), &mut again).unwrap();
    assert_eq!(
        again.record_id(),
        Some(RecordId::new(PageId::new(file.id(), 0), SlotId::new(1)))
    );
    pool.commit(tid).unwrap();

    assert_eq!(scan(&pool, &file), vec![0, 99, 2, 3, 4, 5]);
}

#[test]
fn test_transaction_sees_its_own_new_page() {
    let temp = NamedTempFile::new().unwrap();
    let schema = int_schema();
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), schema.clone()).unwrap();

    let tid = TransactionId::new();
    for v in 0..7 {
        pool.insert_tuple(tid, file.id(), &mut int_tuple(&schema, v)).unwrap();
    }
    let seen = file.iter(&pool, tid).count();
    assert_eq!(seen, 7);
    pool.commit(tid).unwrap();

    assert_eq!(file.num_pages(), 3);
    assert_eq!(scan(&pool, &file), (0..7).collect::<Vec<_>>());
}

#[test]
fn test_schema_mismatch_rejected() {
    let temp = NamedTempFile::new().unwrap();
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), int_schema()).unwrap();

    let other = Arc::new(Schema::from_types(&[DataType::Boolean]).unwrap());
    let mut tuple = Tuple::new(other, vec![Value::Boolean(true)]).unwrap();
    assert!(matches!(
        pool.insert_tuple(TransactionId::new(), file.id(), &mut tuple),
        Err(TarnError::SchemaMismatch)
    ));
}

#[test]
fn test_delete_foreign_or_unplaced_tuple() {
    let temp = NamedTempFile::new().unwrap();
    let schema = int_schema();
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), schema.clone()).unwrap();
    let tid = TransactionId::new();

    let mut unplaced = int_tuple(&schema, 1);
    assert!(matches!(
        file.delete_tuple(&pool, tid, &mut unplaced),
        Err(TarnError::UnplacedTuple)
    ));

    let mut foreign = int_tuple(&schema, 1);
    let elsewhere = TableId::new(file.id().as_u32().wrapping_add(1));
    foreign.set_record_id(Some(RecordId::new(PageId::new(elsewhere, 0), SlotId::new(0))));
    assert!(matches!(
        file.delete_tuple(&pool, tid, &mut foreign),
        Err(TarnError::TupleNotInTable { .. })
    ));
}

#[test]
fn test_iterator_rewind_and_close() {
    let temp = NamedTempFile::new().unwrap();
    let schema = int_schema();
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), schema.clone()).unwrap();

    let tid = TransactionId::new();
    for v in 0..5 {
        pool.insert_tuple(tid, file.id(), &mut int_tuple(&schema, v)).unwrap();
    }
    pool.commit(tid).unwrap();

    let reader = TransactionId::new();
    let mut iter = file.iter(&pool, reader);
    assert_eq!(iter.by_ref().take(4).count(), 4);

    iter.rewind();
    assert_eq!(iter.by_ref().count(), 5);
    assert!(iter.next().is_none());

    iter.rewind();
    iter.next().unwrap().unwrap();
    iter.close();
    assert!(iter.next().is_none());

    // Closing keeps the locks
    assert!(pool.holds_lock(reader, PageId::new(file.id(), 0)));
    pool.commit(reader).unwrap();
}

#[test]
fn test_tuple_too_large_for_page() {
    let temp = NamedTempFile::new().unwrap();
    let schema = Arc::new(Schema::from_types(&[DataType::Char(20)]).unwrap());
    let pool = create_pool(10);
    let file = pool.open_file(temp.path(), schema.clone()).unwrap();

    let mut tuple = Tuple::new(schema, vec![Value::from("x")]).unwrap();
    assert!(matches!(
        pool.insert_tuple(TransactionId::new(), file.id(), &mut tuple),
        Err(TarnError::InvalidArgument(_))
    ));
    assert_eq!(file.num_pages(), 0);
}
