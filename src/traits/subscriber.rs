use crate::error::RowFlowError;
use crate::types::Demand;

/// How a stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The statement ran to completion or the stream was cancelled.
    Finished,
    Failed(RowFlowError),
}

/// Consumer side of a row stream.
pub trait Subscriber<T> {
    /// Receive one decoded item. The returned demand is added to the
    /// cursor's outstanding demand before it steps again.
    fn receive(&mut self, item: T) -> Demand;

    /// Called exactly once when the stream reaches a terminal state.
    fn complete(&mut self, completion: Completion);
}
