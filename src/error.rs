use thiserror::Error;

/// Error type for rowflow operations.
///
/// Engine failures carry the engine's numeric result code and message text
/// exactly as reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowFlowError {
    #[error("Connection failed ({code}): {message}")]
    Connection { code: i32, message: String },

    #[error("Prepare failed ({code}): {message}")]
    Prepare { code: i32, message: String },

    #[error("Bind failed at parameter {position} ({code}): {message}")]
    Bind {
        position: usize,
        code: i32,
        message: String,
    },

    #[error("Step failed ({code}): {message}")]
    Step { code: i32, message: String },

    #[error("Finalize failed ({code}): {message}")]
    Finalize { code: i32, message: String },

    #[error("Unknown storage class {class} in column {column}")]
    UnknownColumnType { class: i32, column: usize },

    #[error("Row does not match the requested output type: {0}")]
    MismatchOutputType(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },
}

impl RowFlowError {
    /// The engine result code, when the error came from the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            RowFlowError::Connection { code, .. }
            | RowFlowError::Prepare { code, .. }
            | RowFlowError::Bind { code, .. }
            | RowFlowError::Step { code, .. }
            | RowFlowError::Finalize { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn mismatch(detail: impl Into<String>) -> Self {
        RowFlowError::MismatchOutputType(detail.into())
    }
}

/// Result type alias for rowflow operations
pub type Result<T> = std::result::Result<T, RowFlowError>;
