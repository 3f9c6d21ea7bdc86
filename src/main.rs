use std::sync::Arc;

use tarn::buffer::BufferPool;
use tarn::common::{StorageConfig, TransactionId};
use tarn::concurrency::Permission;
use tarn::tuple::{DataType, Schema, TupleBuilder, Value};
use tarn::PageId;
use tracing_subscriber::EnvFilter;

fn main() -> tarn::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Tarn - a heap-file storage engine in Rust");
    println!("=========================================\n");

    let db_path = "demo.dat";
    std::fs::remove_file(db_path).ok();

    // Small pages so the demo spans several of them
    let config = StorageConfig::default().with_page_size(64).with_pool_size(8);
    let pool = BufferPool::new(config)?;
    let schema: Arc<Schema> = Schema::builder()
        .field("id", DataType::Integer)
        .field("name", DataType::Text(8))
        .build_arc()?;
    let table = pool.open_file(db_path, schema.clone())?;
    println!("Opened {} as {}", db_path, table.id());
    println!("Schema: {}\n", schema);

    // Insert and commit
    let writer = TransactionId::new();
    for (id, name) in [(1, "ada"), (2, "brian"), (3, "claude"), (4, "dennis"), (5, "edsger")] {
        let mut tuple = TupleBuilder::new(schema.clone()).value(id).value(name).build()?;
        pool.insert_tuple(writer, table.id(), &mut tuple)?;
        println!("Inserted {} at {:?}", tuple, tuple.record_id());
    }
    pool.commit(writer)?;
    println!("\nCommitted {}; file now has {} pages", writer, table.num_pages());

    // Delete one row, then change our mind
    let doomed = TransactionId::new();
    let mut victim = table
        .iter(&pool, doomed)
        .filter_map(Result::ok)
        .find(|t| t.value(0) == Some(&Value::Integer(2)));
    if let Some(tuple) = victim.as_mut() {
        pool.delete_tuple(doomed, tuple)?;
        println!("{} deleted a row, then aborted", doomed);
    }
    pool.abort(doomed)?;

    // A writer blocks readers until it finishes
    let holder = TransactionId::new();
    let contender = TransactionId::new();
    let first_page = PageId::new(table.id(), 0);
    pool.get_page(holder, first_page, Permission::ReadWrite)?;
    match pool.get_page(contender, first_page, Permission::ReadOnly) {
        Ok(_) => println!("{} unexpectedly got {}", contender, first_page),
        Err(e) => println!("{}: {}", contender, e),
    }
    pool.abort(contender)?;
    pool.commit(holder)?;

    // Read everything back
    let reader = TransactionId::new();
    println!("\nContents:");
    for tuple in table.iter(&pool, reader) {
        println!("  {}", tuple?);
    }
    pool.commit(reader)?;

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
    Ok(())
}
