pub mod disk;
pub mod heap;
pub mod page;
