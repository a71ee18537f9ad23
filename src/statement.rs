use std::mem::ManuallyDrop;

use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::{DatabaseDriver, RawStatement, StepResult};
use crate::types::{Row, Value};

/// Owns one prepared statement for the lifetime of a cursor.
///
/// The engine resource is released exactly once: either through
/// [`Statement::finalize`], which consumes the handle, or on drop.
pub struct Statement {
    sql: String,
    raw: ManuallyDrop<Box<dyn RawStatement>>,
}

impl Statement {
    /// Prepare `sql` and bind `parameters` to placeholders 1..=N in order.
    ///
    /// If any bind fails the prepared statement is finalized before the
    /// error is returned.
    pub fn prepare_and_bind(
        driver: &dyn DatabaseDriver,
        sql: &str,
        parameters: &[Option<Value>],
    ) -> Result<Self> {
        let mut raw = driver.prepare(sql)?;
        if let Err(e) = bind_all(raw.as_mut(), parameters) {
            if let Err(finalize_error) = raw.finalize() {
                warn!(sql = %sql, error = %finalize_error, "finalize failed after bind error");
            }
            return Err(e);
        }
        debug!(sql = %sql, parameters = parameters.len(), "statement prepared");
        Ok(Self {
            sql: sql.to_string(),
            raw: ManuallyDrop::new(raw),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn step(&mut self) -> Result<StepResult> {
        self.raw.step()
    }

    pub(crate) fn column_count(&self) -> usize {
        self.raw.column_count()
    }

    pub(crate) fn read_row(&self) -> Result<Row> {
        Row::decode(&**self.raw)
    }

    /// Release the engine resource and report the engine's verdict.
    pub fn finalize(self) -> Result<()> {
        let mut this = ManuallyDrop::new(self);
        let sql = std::mem::take(&mut this.sql);
        // SAFETY: `this` is never dropped, so `raw` is taken exactly once.
        let raw = unsafe { ManuallyDrop::take(&mut this.raw) };
        debug!(sql = %sql, "statement finalized");
        raw.finalize()
    }
}

fn bind_all(raw: &mut dyn RawStatement, parameters: &[Option<Value>]) -> Result<()> {
    for (i, parameter) in parameters.iter().enumerate() {
        raw.bind(i + 1, parameter.as_ref())?;
    }
    Ok(())
}

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: `finalize` bypasses this destructor, so `raw` is still present.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        if let Err(e) = raw.finalize() {
            warn!(sql = %self.sql, error = %e, "finalize failed");
        }
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}
