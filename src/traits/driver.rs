use crate::error::Result;
use crate::types::Value;

/// Outcome of advancing a prepared statement by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available for reading.
    Row,
    /// The statement has run to completion.
    Done,
}

/// Trait for storage engine connections.
/// Drivers are responsible for:
/// - Compiling SQL text into a prepared statement
/// - Closing the underlying connection
///
/// A connection is shared by every cursor derived from it.
pub trait DatabaseDriver: Send + Sync {
    /// Compile one SQL statement. Placeholders are positional (`?`).
    fn prepare(&self, sql: &str) -> Result<Box<dyn RawStatement>>;

    /// Close the connection. Fails while any prepared statement is still
    /// outstanding.
    fn close(&self) -> Result<()>;
}

/// A prepared statement owned by exactly one statement handle.
///
/// Column accessors read the row produced by the most recent
/// [`RawStatement::step`] that returned [`StepResult::Row`].
pub trait RawStatement: Send {
    /// Bind a value at a 1-based position. `None` binds NULL.
    fn bind(&mut self, position: usize, value: Option<&Value>) -> Result<()>;

    fn step(&mut self) -> Result<StepResult>;

    fn column_count(&self) -> usize;

    /// Engine type code of a column in the current row.
    fn column_type(&self, index: usize) -> i32;

    fn column_integer(&self, index: usize) -> i64;

    fn column_real(&self, index: usize) -> f64;

    /// Fails with `MismatchOutputType` when the stored bytes are not UTF-8.
    fn column_text(&self, index: usize) -> Result<String>;

    fn column_blob(&self, index: usize) -> Vec<u8>;

    /// Release the engine resource.
    fn finalize(self: Box<Self>) -> Result<()>;
}
