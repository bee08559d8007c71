pub mod keyed_source;
pub mod memory_source;
pub mod sqlite_source;

pub use keyed_source::KeyedMemorySource;
pub use memory_source::MemorySource;
pub use sqlite_source::{Record, SqliteSource};
