mod template;

pub use template::{placeholders, quote_identifier, SqlTemplate};
