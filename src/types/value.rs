/// A dynamically typed SQL value.
///
/// The same closed set of variants is used for bound parameters and for
/// decoded column values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Ordered parameter list. `None` binds SQL NULL.
pub type Parameters = Vec<Option<Value>>;

impl Value {
    /// Returns the storage class this value is stored with.
    pub fn storage_class(&self) -> StorageClass {
        match self {
            Value::Null => StorageClass::Null,
            Value::Integer(_) => StorageClass::Integer,
            Value::Real(_) => StorageClass::Real,
            Value::Text(_) => StorageClass::Text,
            Value::Blob(_) => StorageClass::Blob,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// The dynamic type tag the engine attaches to a column value at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
    Null,
}

impl StorageClass {
    /// Maps an engine type code onto a storage class.
    ///
    /// Codes follow the SQLite fundamental datatypes: 1 integer, 2 real,
    /// 3 text, 4 blob, 5 null.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(StorageClass::Integer),
            2 => Some(StorageClass::Real),
            3 => Some(StorageClass::Text),
            4 => Some(StorageClass::Blob),
            5 => Some(StorageClass::Null),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            StorageClass::Integer => 1,
            StorageClass::Real => 2,
            StorageClass::Text => 3,
            StorageClass::Blob => 4,
            StorageClass::Null => 5,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(f64::from(value))
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}
