//! Integration tests for heap pages

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tarn::common::{PageId, TableId, TarnError};
use tarn::storage::page::HeapPage;
use tarn::tuple::{DataType, Schema, Tuple, Value};

fn page_id() -> PageId {
    PageId::new(TableId::new(42), 0)
}

fn schema_of_size(row_size: usize) -> Arc<Schema> {
    // Char(n) is exactly n bytes wide
    Arc::new(Schema::from_types(&[DataType::Char(row_size as u16)]).unwrap())
}

fn row(schema: &Arc<Schema>, i: usize) -> Tuple {
    let text = (i % 10).to_string();
    Tuple::new(schema.clone(), vec![Value::String(text)]).unwrap()
}

#[test]
fn test_slot_capacity_formula() {
    for (page_size, row_size) in [(16, 4), (64, 3), (128, 1), (4096, 13), (4096, 100), (100, 99)] {
        let schema = schema_of_size(row_size);
        let mut page = HeapPage::new(page_id(), schema.clone(), &HeapPage::empty_page_data(page_size)).unwrap();

        let capacity = (8 * page_size) / (8 * row_size + 1);
        assert_eq!(page.num_slots(), capacity);
        assert_eq!(page.header_size(), capacity.div_ceil(8));

        for i in 0..capacity {
            page.insert_tuple(&mut row(&schema, i)).unwrap();
        }
        assert_eq!(page.num_empty_slots(), 0);
        assert!(matches!(
            page.insert_tuple(&mut row(&schema, capacity)),
            Err(TarnError::PageFull(_))
        ));
    }
}

#[test]
fn test_insert_delete_round_trip() {
    let schema = schema_of_size(8);
    let mut page = HeapPage::empty(page_id(), schema.clone(), 256);

    page.insert_tuple(&mut row(&schema, 0)).unwrap();
    let before = page.num_empty_slots();

    let mut tuple = row(&schema, 1);
    let rid = page.insert_tuple(&mut tuple).unwrap();
    assert_eq!(page.num_empty_slots(), before - 1);
    assert!(page.is_slot_used(rid.slot_id.as_usize()));

    page.delete_tuple(&mut tuple).unwrap();
    assert_eq!(page.num_empty_slots(), before);
    assert_eq!(tuple.record_id(), None);

    // The old record id no longer names a tuple
    tuple.set_record_id(Some(rid));
    assert!(matches!(
        page.delete_tuple(&mut tuple),
        Err(TarnError::EmptySlot { .. })
    ));
}

#[test]
fn test_iteration_is_restartable() {
    let schema = Arc::new(Schema::from_types(&[DataType::Integer]).unwrap());
    let mut page = HeapPage::empty(page_id(), schema.clone(), 64);
    for v in [5, 6, 7] {
        let mut tuple = Tuple::new(schema.clone(), vec![Value::Integer(v)]).unwrap();
        page.insert_tuple(&mut tuple).unwrap();
    }

    let first: Vec<_> = page.iter().cloned().collect();
    let second: Vec<_> = page.iter().cloned().collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_random_inserts_and_deletes_survive_serialization() {
    let mut rng = StdRng::seed_from_u64(7);
    let schema = Arc::new(Schema::from_types(&[DataType::Integer, DataType::Text(6)]).unwrap());
    let mut page = HeapPage::empty(page_id(), schema.clone(), 512);
    let mut live: Vec<Tuple> = Vec::new();

    for i in 0..400 {
        let delete = !live.is_empty() && (page.num_empty_slots() == 0 || rng.gen_bool(0.4));
        if delete {
            let mut victim = live.swap_remove(rng.gen_range(0..live.len()));
            page.delete_tuple(&mut victim).unwrap();
        } else {
            let mut tuple = Tuple::new(
                schema.clone(),
                vec![Value::Integer(i), Value::from(format!("r{}", i % 1000))],
            )
            .unwrap();
            page.insert_tuple(&mut tuple).unwrap();
            live.push(tuple);
        }

        assert_eq!(page.num_slots() - page.num_empty_slots(), live.len());
    }

    let reparsed = HeapPage::new(page_id(), schema, &page.page_data()).unwrap();
    let mut expected: Vec<_> = live.iter().map(|t| t.record_id()).collect();
    let mut actual: Vec<_> = reparsed.iter().map(|t| t.record_id()).collect();
    expected.sort_by_key(|rid| rid.map(|r| r.slot_id));
    actual.sort_by_key(|rid| rid.map(|r| r.slot_id));
    assert_eq!(actual, expected);
}
