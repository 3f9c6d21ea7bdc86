mod heap_file;
mod iterator;

pub use heap_file::HeapFile;
pub use iterator::HeapFileIter;
