//! Conversion of decoded rows into caller-chosen output shapes.
//!
//! The requested shape is fixed per stream by the output type `T` of a
//! [`crate::Query<T>`], and every row must satisfy it independently:
//!
//! - [`Scalar<T>`]: exactly one column.
//! - `Vec<Option<T>>`: any number of columns, all of type `T` or NULL.
//! - Tuples `(T1, ..., Tn)` for `1 <= n <= 32`, and fixed-size arrays
//!   `[T; N]`: exactly `n` columns.
//! - `()`: zero columns. A write statement streamed as `()` yields one
//!   acknowledgement when it completes.

use crate::error::{Result, RowFlowError};
use crate::types::{Row, Value};

/// Widest row a fixed-arity output shape can describe. Wider rows must be
/// read as `Vec<Option<T>>`.
pub const MAX_TUPLE_ARITY: usize = 32;

/// Decode a single column value.
///
/// `None` is SQL NULL. Only `Option<T>` accepts it.
pub trait FromValue: Sized {
    fn from_value(value: Option<Value>) -> Result<Self>;
}

/// Convert a whole row into an output shape.
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self>;

    /// The value delivered once when a zero-column statement runs to
    /// completion. Only the unit shape has one.
    fn acknowledgement() -> Option<Self> {
        None
    }
}

fn unexpected(expected: &str, value: &Option<Value>) -> RowFlowError {
    let found = match value {
        None => "NULL".to_string(),
        Some(v) => format!("{:?}", v.storage_class()).to_lowercase(),
    };
    RowFlowError::mismatch(format!("expected {}, found {}", expected, found))
}

impl FromValue for Value {
    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            Some(v) if !v.is_null() => Ok(v),
            other => Err(unexpected("a value", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            Some(Value::Integer(v)) => Ok(v),
            other => Err(unexpected("integer", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Option<Value>) -> Result<Self> {
        let v = i64::from_value(value)?;
        i32::try_from(v).map_err(|_| RowFlowError::mismatch(format!("{} out of range for i32", v)))
    }
}

impl FromValue for bool {
    fn from_value(value: Option<Value>) -> Result<Self> {
        i64::from_value(value).map(|v| v != 0)
    }
}

impl FromValue for f64 {
    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            Some(Value::Real(v)) => Ok(v),
            other => Err(unexpected("real", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            Some(Value::Text(v)) => Ok(v),
            other => Err(unexpected("text", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            Some(Value::Blob(v)) => Ok(v),
            other => Err(unexpected("blob", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(None),
            some => T::from_value(some).map(Some),
        }
    }
}

/// A row with exactly one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar<T>(pub T);

impl<T> Scalar<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn check_arity(row: &Row, expected: usize) -> Result<()> {
    if expected > MAX_TUPLE_ARITY {
        return Err(RowFlowError::mismatch(format!(
            "arity {} exceeds the maximum of {}",
            expected, MAX_TUPLE_ARITY
        )));
    }
    if row.len() != expected {
        return Err(RowFlowError::mismatch(format!(
            "expected {} column(s), found {}",
            expected,
            row.len()
        )));
    }
    Ok(())
}

impl<T: FromValue> FromRow for Scalar<T> {
    fn from_row(row: Row) -> Result<Self> {
        check_arity(&row, 1)?;
        let value = row.into_values().into_iter().next().flatten();
        T::from_value(value).map(Scalar)
    }
}

/// Sequence shape: homogeneous, any arity, column order preserved.
impl<T: FromValue> FromRow for Vec<Option<T>> {
    fn from_row(row: Row) -> Result<Self> {
        row.into_values()
            .into_iter()
            .map(Option::<T>::from_value)
            .collect()
    }
}

/// Fixed-arity homogeneous record. `N` above [`MAX_TUPLE_ARITY`] never
/// matches any row.
impl<T: FromValue, const N: usize> FromRow for [T; N] {
    fn from_row(row: Row) -> Result<Self> {
        check_arity(&row, N)?;
        let values = row
            .into_values()
            .into_iter()
            .map(T::from_value)
            .collect::<Result<Vec<T>>>()?;
        values
            .try_into()
            .map_err(|_| RowFlowError::mismatch(format!("expected {} column(s)", N)))
    }
}

/// Unit shape: zero columns, acknowledged once per executed write.
impl FromRow for () {
    fn from_row(row: Row) -> Result<Self> {
        check_arity(&row, 0)
    }

    fn acknowledgement() -> Option<Self> {
        Some(())
    }
}

macro_rules! tuple_from_row {
    () => {};
    ($head:ident $(, $tail:ident)*) => {
        impl<$head: FromValue, $($tail: FromValue),*> FromRow for ($head, $($tail,)*) {
            fn from_row(row: Row) -> Result<Self> {
                check_arity(&row, [stringify!($head) $(, stringify!($tail))*].len())?;
                let mut values = row.into_values().into_iter();
                Ok((
                    $head::from_value(values.next().flatten())?,
                    $($tail::from_value(values.next().flatten())?,)*
                ))
            }
        }

        tuple_from_row!($($tail),*);
    };
}

tuple_from_row!(
    A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z, A1, B1, C1, D1,
    E1, F1
);
