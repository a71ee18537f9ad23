//! rowflow - Demand-driven row streams over SQLite prepared statements
//!
//! A [`Query`] describes SQL text, its parameters and the shape each row is
//! decoded into. Subscribing prepares a fresh statement and returns a
//! [`Cursor`] that steps the engine only as far as the consumer asks.
//!
//! # Example
//! ```
//! use rowflow::{RowFlowClient, Scalar, Value};
//!
//! let client = RowFlowClient::open_in_memory()?;
//! client.execute("CREATE TABLE users (id INTEGER, name TEXT)", vec![])?;
//! client.execute(
//!     "INSERT INTO users VALUES (?, ?)",
//!     vec![Some(Value::Integer(1)), Some(Value::from("John"))],
//! )?;
//!
//! let (id, name) = client
//!     .query::<(i64, String)>("SELECT id, name FROM users", vec![])
//!     .one()?;
//! assert_eq!((id, name.as_str()), (1, "John"));
//!
//! let count = client
//!     .query::<Scalar<i64>>("SELECT count(*) FROM users", vec![])
//!     .one()?;
//! assert_eq!(count, Scalar(1));
//! # Ok::<(), rowflow::RowFlowError>(())
//! ```

pub mod builders;
pub mod config;
pub mod cursor;
pub mod drivers;
pub mod error;
pub mod output;
pub mod query;
pub mod statement;
pub mod traits;
pub mod types;

mod client;

// Re-export main types for convenient access
pub use builders::SqlTemplate;
pub use client::RowFlowClient;
pub use config::{ConnectionOptions, OpenMode};
pub use cursor::{Cursor, CursorState, RowBuffer, Rows};
pub use error::{Result, RowFlowError};
pub use output::{FromRow, FromValue, Scalar, MAX_TUPLE_ARITY};
pub use query::Query;
pub use statement::Statement;
pub use traits::{Completion, DatabaseDriver, RawStatement, StepResult, Subscriber};
pub use types::{Demand, Parameters, Row, StorageClass, Value};
