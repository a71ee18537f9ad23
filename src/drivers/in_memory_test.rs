use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, RowFlowError};
use crate::traits::{DatabaseDriver, RawStatement, StepResult};
use crate::types::Value;

/// A recorded statement execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<Option<Value>>,
}

/// One column cell of a scripted row: the type code the engine reports and
/// the payload read back through the typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCell {
    pub code: i32,
    pub value: Value,
}

impl From<Option<Value>> for ScriptedCell {
    fn from(value: Option<Value>) -> Self {
        let value = value.unwrap_or(Value::Null);
        Self {
            code: value.storage_class().code(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ScriptedError {
    code: i32,
    message: String,
}

/// Scripted behavior for one prepared statement.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    columns: Option<usize>,
    rows: Vec<Vec<ScriptedCell>>,
    prepare_error: Option<ScriptedError>,
    bind_error: Option<(usize, ScriptedError)>,
    step_error: Option<(usize, ScriptedError)>,
    finalize_error: Option<ScriptedError>,
}

impl ScriptedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column count reported once the statement is done. Defaults
    /// to the width of the first row, or zero.
    pub fn columns(mut self, count: usize) -> Self {
        self.columns = Some(count);
        self
    }

    /// Add a row of values.
    pub fn row(mut self, values: Vec<Option<Value>>) -> Self {
        self.rows
            .push(values.into_iter().map(ScriptedCell::from).collect());
        self
    }

    /// Add `count` rows produced by `make`.
    pub fn rows(mut self, count: usize, make: impl Fn(usize) -> Vec<Option<Value>>) -> Self {
        for i in 0..count {
            self = self.row(make(i));
        }
        self
    }

    /// Add a row with explicit type codes.
    pub fn raw_row(mut self, cells: Vec<ScriptedCell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn fail_prepare(mut self, code: i32, message: &str) -> Self {
        self.prepare_error = Some(ScriptedError {
            code,
            message: message.to_string(),
        });
        self
    }

    /// Fail when binding the given 1-based position.
    pub fn fail_bind_at(mut self, position: usize, code: i32, message: &str) -> Self {
        self.bind_error = Some((
            position,
            ScriptedError {
                code,
                message: message.to_string(),
            },
        ));
        self
    }

    /// Fail the given 0-based step.
    pub fn fail_step_at(mut self, step: usize, code: i32, message: &str) -> Self {
        self.step_error = Some((
            step,
            ScriptedError {
                code,
                message: message.to_string(),
            },
        ));
        self
    }

    pub fn fail_finalize(mut self, code: i32, message: &str) -> Self {
        self.finalize_error = Some(ScriptedError {
            code,
            message: message.to_string(),
        });
        self
    }
}

#[derive(Default)]
struct DriverState {
    responses: VecDeque<ScriptedResponse>,
    default_response: ScriptedResponse,
    recorded_queries: Vec<RecordedQuery>,
    steps: usize,
    finalized: usize,
    open_statements: usize,
    closed: bool,
}

/// An in-memory storage engine for testing.
///
/// Each prepared statement takes the next scripted response in FIFO order
/// (or the default response). Every prepare, bind, step and finalize is
/// recorded so resource discipline can be asserted.
///
/// # Example
/// ```
/// use rowflow::drivers::{InMemoryTestDriver, ScriptedResponse};
/// use rowflow::Value;
///
/// let driver = InMemoryTestDriver::new().with_response(
///     ScriptedResponse::new()
///         .row(vec![Some(Value::Integer(1)), Some(Value::from("Alice"))]),
/// );
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTestDriver {
    state: Arc<Mutex<DriverState>>,
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for the next prepared statement.
    pub fn with_response(self, response: ScriptedResponse) -> Self {
        self.lock().responses.push_back(response);
        self
    }

    /// Add multiple responses for subsequent prepared statements.
    pub fn with_responses(self, responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        self.lock().responses.extend(responses);
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(self, response: ScriptedResponse) -> Self {
        self.lock().default_response = response;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded statements that have been prepared.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.lock().recorded_queries.clone()
    }

    /// Get the last recorded statement, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.lock().recorded_queries.last().cloned()
    }

    /// Total number of steps taken across all statements.
    pub fn step_count(&self) -> usize {
        self.lock().steps
    }

    /// Total number of finalized statements.
    pub fn finalize_count(&self) -> usize {
        self.lock().finalized
    }

    /// Statements prepared but not yet finalized.
    pub fn open_statements(&self) -> usize {
        self.lock().open_statements
    }

    /// Assert that the last statement matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[Option<Value>]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n statements were prepared.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.lock().recorded_queries.len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }
}

impl DatabaseDriver for InMemoryTestDriver {
    fn prepare(&self, sql: &str) -> Result<Box<dyn RawStatement>> {
        let mut state = self.lock();
        if state.closed {
            return Err(RowFlowError::Connection {
                code: 21,
                message: "connection is closed".to_string(),
            });
        }
        let response = state
            .responses
            .pop_front()
            .unwrap_or_else(|| state.default_response.clone());
        if let Some(e) = response.prepare_error {
            return Err(RowFlowError::Prepare {
                code: e.code,
                message: e.message,
            });
        }

        state.recorded_queries.push(RecordedQuery {
            sql: sql.to_string(),
            params: Vec::new(),
        });
        state.open_statements += 1;
        let query_index = state.recorded_queries.len() - 1;

        Ok(Box::new(InMemoryStatement {
            state: Arc::clone(&self.state),
            response,
            query_index,
            position: None,
            next_row: 0,
            steps: 0,
        }))
    }

    fn close(&self) -> Result<()> {
        let mut state = self.lock();
        if state.open_statements > 0 {
            return Err(RowFlowError::Connection {
                code: 5,
                message: "unable to close due to unfinalized statements".to_string(),
            });
        }
        state.closed = true;
        Ok(())
    }
}

struct InMemoryStatement {
    state: Arc<Mutex<DriverState>>,
    response: ScriptedResponse,
    query_index: usize,
    /// Index of the current row; `None` before the first step or after the last.
    position: Option<usize>,
    next_row: usize,
    steps: usize,
}

impl InMemoryStatement {
    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cell(&self, index: usize) -> Option<&ScriptedCell> {
        self.position
            .and_then(|row| self.response.rows.get(row))
            .and_then(|row| row.get(index))
    }
}

impl RawStatement for InMemoryStatement {
    fn bind(&mut self, position: usize, value: Option<&Value>) -> Result<()> {
        if let Some((at, e)) = &self.response.bind_error {
            if *at == position {
                return Err(RowFlowError::Bind {
                    position,
                    code: e.code,
                    message: e.message.clone(),
                });
            }
        }
        let index = self.query_index;
        self.lock().recorded_queries[index].params.push(value.cloned());
        Ok(())
    }

    fn step(&mut self) -> Result<StepResult> {
        let step = self.steps;
        self.steps += 1;
        self.lock().steps += 1;

        if let Some((at, e)) = &self.response.step_error {
            if *at == step {
                self.position = None;
                return Err(RowFlowError::Step {
                    code: e.code,
                    message: e.message.clone(),
                });
            }
        }

        if self.next_row < self.response.rows.len() {
            self.position = Some(self.next_row);
            self.next_row += 1;
            Ok(StepResult::Row)
        } else {
            self.position = None;
            Ok(StepResult::Done)
        }
    }

    fn column_count(&self) -> usize {
        match self.position.and_then(|row| self.response.rows.get(row)) {
            Some(row) => row.len(),
            None => self
                .response
                .columns
                .unwrap_or_else(|| self.response.rows.first().map_or(0, Vec::len)),
        }
    }

    fn column_type(&self, index: usize) -> i32 {
        self.cell(index).map_or(5, |cell| cell.code)
    }

    fn column_integer(&self, index: usize) -> i64 {
        match self.cell(index).map(|cell| &cell.value) {
            Some(Value::Integer(v)) => *v,
            _ => 0,
        }
    }

    fn column_real(&self, index: usize) -> f64 {
        match self.cell(index).map(|cell| &cell.value) {
            Some(Value::Real(v)) => *v,
            _ => 0.0,
        }
    }

    fn column_text(&self, index: usize) -> Result<String> {
        match self.cell(index).map(|cell| &cell.value) {
            Some(Value::Text(v)) => Ok(v.clone()),
            _ => Ok(String::new()),
        }
    }

    fn column_blob(&self, index: usize) -> Vec<u8> {
        match self.cell(index).map(|cell| &cell.value) {
            Some(Value::Blob(v)) => v.clone(),
            _ => Vec::new(),
        }
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        let mut state = self.lock();
        state.finalized += 1;
        state.open_statements -= 1;
        match &self.response.finalize_error {
            Some(e) => Err(RowFlowError::Finalize {
                code: e.code,
                message: e.message.clone(),
            }),
            None => Ok(()),
        }
    }
}
