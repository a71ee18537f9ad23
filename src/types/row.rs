use crate::error::{Result, RowFlowError};
use crate::traits::RawStatement;
use crate::types::{StorageClass, Value};

/// A single decoded result row.
/// Columns are kept in result order; SQL NULL is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Option<Value>>,
}

impl Row {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    /// Reads every column of the row the statement is currently positioned on.
    ///
    /// Column count and storage classes are taken from the engine for this
    /// row only; they are not fixed by the statement.
    pub(crate) fn decode(stmt: &dyn RawStatement) -> Result<Self> {
        let count = stmt.column_count();
        let mut values = Vec::with_capacity(count);
        for column in 0..count {
            let code = stmt.column_type(column);
            let class = StorageClass::from_code(code)
                .ok_or(RowFlowError::UnknownColumnType { class: code, column })?;
            let value = match class {
                StorageClass::Null => None,
                StorageClass::Integer => Some(Value::Integer(stmt.column_integer(column))),
                StorageClass::Real => Some(Value::Real(stmt.column_real(column))),
                StorageClass::Text => Some(Value::Text(stmt.column_text(column)?)),
                StorageClass::Blob => Some(Value::Blob(stmt.column_blob(column))),
            };
            values.push(value);
        }
        Ok(Self { values })
    }

    /// Gets the value of a column by index. Returns `None` for SQL NULL and
    /// for out-of-range indexes.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    /// Returns the column values in order.
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
