use std::marker::PhantomData;
use std::sync::Arc;

use crate::builders::SqlTemplate;
use crate::cursor::{Cursor, RowBuffer, Rows};
use crate::error::{Result, RowFlowError};
use crate::output::FromRow;
use crate::traits::{DatabaseDriver, Subscriber};
use crate::types::Parameters;

/// A reusable description of a row stream: SQL text, parameters and the
/// output shape `T`.
///
/// A `Query` holds no statement. Every subscription prepares a fresh one,
/// so the same query can drive any number of independent cursors.
pub struct Query<T> {
    driver: Arc<dyn DatabaseDriver>,
    sql: String,
    params: Parameters,
    _output: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            sql: self.sql.clone(),
            params: self.params.clone(),
            _output: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish()
    }
}

impl<T: FromRow> Query<T> {
    pub fn new(driver: Arc<dyn DatabaseDriver>, sql: impl Into<String>, params: Parameters) -> Self {
        Self {
            driver,
            sql: sql.into(),
            params,
            _output: PhantomData,
        }
    }

    pub fn from_template(driver: Arc<dyn DatabaseDriver>, template: SqlTemplate) -> Self {
        let (sql, params) = template.build();
        Self::new(driver, sql, params)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The same statement decoded into a different output shape.
    pub fn returning<U: FromRow>(self) -> Query<U> {
        Query {
            driver: self.driver,
            sql: self.sql,
            params: self.params,
            _output: PhantomData,
        }
    }

    /// Prepare and bind a new statement and attach `subscriber` to it.
    /// No rows are produced until the returned cursor receives demand.
    pub fn subscribe<S: Subscriber<T>>(&self, subscriber: S) -> Result<Cursor<T, S>> {
        Cursor::open(self.driver.as_ref(), &self.sql, &self.params, subscriber)
    }

    /// Iterate rows one unit of demand at a time.
    pub fn rows(&self) -> Result<Rows<T>> {
        Ok(Rows::new(self.subscribe(RowBuffer::new())?))
    }

    /// Collect every row.
    pub fn all(&self) -> Result<Vec<T>> {
        self.rows()?.collect()
    }

    /// Extracts a single row from the result.
    /// Returns an error if the statement yields zero or more than one row.
    pub fn one(&self) -> Result<T> {
        let mut rows = self.all()?;
        if rows.len() != 1 {
            return Err(RowFlowError::UnexpectedRowCount {
                expected: 1,
                actual: rows.len(),
            });
        }
        rows.pop().ok_or(RowFlowError::UnexpectedRowCount {
            expected: 1,
            actual: 0,
        })
    }

    /// Zero or one row.
    pub fn optional(&self) -> Result<Option<T>> {
        let mut rows = self.all()?;
        if rows.len() > 1 {
            return Err(RowFlowError::UnexpectedRowCount {
                expected: 1,
                actual: rows.len(),
            });
        }
        Ok(rows.pop())
    }
}

impl Query<()> {
    /// Run a statement that produces no columns, waiting for its
    /// acknowledgement.
    pub fn execute(&self) -> Result<()> {
        self.all().map(|_| ())
    }
}
