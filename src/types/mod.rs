mod demand;
mod row;
mod value;

pub use demand::Demand;
pub use row::Row;
pub use value::{Parameters, StorageClass, Value};
