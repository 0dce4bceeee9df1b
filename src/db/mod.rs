pub mod memory;
pub mod repo;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use repo::*;
pub use sqlite::SqliteKvStore;
