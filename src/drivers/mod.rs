mod in_memory_test;
mod sqlite;

pub use self::in_memory_test::{InMemoryTestDriver, RecordedQuery, ScriptedCell, ScriptedResponse};
pub use self::sqlite::SqliteDriver;
