mod driver;
mod subscriber;

pub use driver::{DatabaseDriver, RawStatement, StepResult};
pub use subscriber::{Completion, Subscriber};
