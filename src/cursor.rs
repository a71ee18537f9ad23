use std::collections::VecDeque;
use std::marker::PhantomData;

use tracing::{debug, trace, warn};

use crate::error::{Result, RowFlowError};
use crate::output::FromRow;
use crate::statement::Statement;
use crate::traits::{Completion, DatabaseDriver, StepResult, Subscriber};
use crate::types::{Demand, Value};

/// Lifecycle state of a cursor. Every state but `Active` is terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorState {
    Active,
    Finished,
    Failed(RowFlowError),
    Cancelled,
}

impl CursorState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CursorState::Active)
    }
}

/// Drives one prepared statement on behalf of one subscriber.
///
/// Rows are produced only against outstanding demand: for `n` units
/// requested, at most `n` items reach the subscriber. Demand returned from
/// [`Subscriber::receive`] is folded back into the counter, so a single
/// [`Cursor::request`] call keeps stepping for as long as the subscriber
/// keeps asking.
///
/// The statement is finalized exactly once, on whichever exit path is taken
/// first: end of results, failure, [`Cursor::cancel`], or drop.
pub struct Cursor<T, S>
where
    T: FromRow,
    S: Subscriber<T>,
{
    statement: Option<Statement>,
    demand: Demand,
    state: CursorState,
    subscriber: S,
    _output: PhantomData<fn() -> T>,
}

impl<T, S> Cursor<T, S>
where
    T: FromRow,
    S: Subscriber<T>,
{
    /// Prepare `sql`, bind `parameters` and start an active cursor.
    ///
    /// Nothing is stepped until demand is requested.
    pub fn open(
        driver: &dyn DatabaseDriver,
        sql: &str,
        parameters: &[Option<Value>],
        subscriber: S,
    ) -> Result<Self> {
        let statement = Statement::prepare_and_bind(driver, sql, parameters)?;
        Ok(Self::new(statement, subscriber))
    }

    pub fn new(statement: Statement, subscriber: S) -> Self {
        Self {
            statement: Some(statement),
            demand: Demand::none(),
            state: CursorState::Active,
            subscriber,
            _output: PhantomData,
        }
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CursorState::Active
    }

    /// Outstanding demand not yet consumed by a step.
    pub fn demand(&self) -> Demand {
        self.demand
    }

    pub fn subscriber(&self) -> &S {
        &self.subscriber
    }

    pub fn subscriber_mut(&mut self) -> &mut S {
        &mut self.subscriber
    }

    /// Add demand and step the statement while any is outstanding.
    ///
    /// A no-op once the cursor is terminal.
    pub fn request(&mut self, demand: Demand) {
        if !self.is_active() {
            return;
        }
        self.demand += demand;
        while self.is_active() && self.demand.take_one() {
            self.step();
        }
    }

    /// Stop the stream. The subscriber sees a normal completion.
    ///
    /// A no-op once the cursor is terminal.
    pub fn cancel(&mut self) {
        if !self.is_active() {
            return;
        }
        if let Some(statement) = self.statement.take() {
            if let Err(e) = statement.finalize() {
                warn!(error = %e, "finalize failed on cancel");
            }
        }
        self.demand = Demand::none();
        self.state = CursorState::Cancelled;
        debug!("cursor cancelled");
        self.subscriber.complete(Completion::Finished);
    }

    fn step(&mut self) {
        let Some(statement) = self.statement.as_mut() else {
            return;
        };
        match statement.step() {
            Ok(StepResult::Row) => {
                trace!("row available");
                match statement.read_row().and_then(T::from_row) {
                    Ok(item) => {
                        let more = self.subscriber.receive(item);
                        self.demand += more;
                    }
                    Err(e) => self.fail(e),
                }
            }
            Ok(StepResult::Done) => {
                if statement.column_count() == 0 {
                    if let Some(ack) = T::acknowledgement() {
                        let _ = self.subscriber.receive(ack);
                    }
                }
                self.finish();
            }
            Err(e) => self.fail(e),
        }
    }

    fn finish(&mut self) {
        let result = match self.statement.take() {
            Some(statement) => statement.finalize(),
            None => Ok(()),
        };
        match result {
            Ok(()) => {
                self.state = CursorState::Finished;
                debug!("cursor finished");
                self.subscriber.complete(Completion::Finished);
            }
            Err(e) => self.terminate(e),
        }
    }

    fn fail(&mut self, error: RowFlowError) {
        if let Some(statement) = self.statement.take() {
            // SQLite repeats the step error from finalize; the first one wins.
            if let Err(e) = statement.finalize() {
                trace!(error = %e, "finalize after failure");
            }
        }
        self.terminate(error);
    }

    fn terminate(&mut self, error: RowFlowError) {
        debug!(error = %error, "cursor failed");
        self.demand = Demand::none();
        self.state = CursorState::Failed(error.clone());
        self.subscriber.complete(Completion::Failed(error));
    }
}

impl<T, S> Drop for Cursor<T, S>
where
    T: FromRow,
    S: Subscriber<T>,
{
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Subscriber that buffers items until they are pulled.
#[derive(Debug)]
pub struct RowBuffer<T> {
    items: VecDeque<T>,
    completion: Option<Completion>,
}

impl<T> RowBuffer<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            completion: None,
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }
}

impl<T> Default for RowBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subscriber<T> for RowBuffer<T> {
    fn receive(&mut self, item: T) -> Demand {
        self.items.push_back(item);
        Demand::none()
    }

    fn complete(&mut self, completion: Completion) {
        self.completion = Some(completion);
    }
}

/// Pull-based iterator over a cursor. Each call to `next` requests one unit
/// of demand; a failure is yielded once as `Err` and ends iteration.
pub struct Rows<T: FromRow> {
    cursor: Cursor<T, RowBuffer<T>>,
}

impl<T: FromRow> Rows<T> {
    pub(crate) fn new(cursor: Cursor<T, RowBuffer<T>>) -> Self {
        Self { cursor }
    }

    pub fn state(&self) -> &CursorState {
        self.cursor.state()
    }

    /// Stop iterating and release the statement.
    pub fn cancel(&mut self) {
        self.cursor.cancel();
    }
}

impl<T: FromRow> Iterator for Rows<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.cursor.subscriber_mut().pop() {
            return Some(Ok(item));
        }
        self.cursor.request(Demand::max(1));
        if let Some(item) = self.cursor.subscriber_mut().pop() {
            return Some(Ok(item));
        }
        match self.cursor.subscriber_mut().completion.take() {
            Some(Completion::Failed(e)) => Some(Err(e)),
            _ => None,
        }
    }
}
