use std::path::Path;
use std::sync::Arc;

use crate::builders::SqlTemplate;
use crate::config::ConnectionOptions;
use crate::drivers::SqliteDriver;
use crate::error::Result;
use crate::output::FromRow;
use crate::query::Query;
use crate::traits::DatabaseDriver;
use crate::types::Parameters;

/// Main entry point for rowflow.
/// Holds a database connection and creates queries against it.
#[derive(Clone)]
pub struct RowFlowClient {
    driver: Arc<dyn DatabaseDriver>,
}

impl RowFlowClient {
    /// Open a SQLite database.
    ///
    /// # Example
    /// ```ignore
    /// let client = RowFlowClient::open("app.db", &ConnectionOptions::default())?;
    /// ```
    pub fn open(path: impl AsRef<Path>, options: &ConnectionOptions) -> Result<Self> {
        let driver = SqliteDriver::open(path, options)?;
        Ok(Self {
            driver: Arc::new(driver),
        })
    }

    /// Open a private in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            driver: Arc::new(SqliteDriver::open_in_memory()?),
        })
    }

    /// Create a new client with a custom driver.
    /// Useful for testing or using alternative storage engines.
    pub fn with_driver(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// Describe a row stream decoded as `T`.
    pub fn query<T: FromRow>(&self, sql: impl Into<String>, params: Parameters) -> Query<T> {
        Query::new(Arc::clone(&self.driver), sql, params)
    }

    /// Describe a row stream from an assembled template.
    pub fn template<T: FromRow>(&self, template: SqlTemplate) -> Query<T> {
        Query::from_template(Arc::clone(&self.driver), template)
    }

    /// Run a statement that produces no columns.
    pub fn execute(&self, sql: impl Into<String>, params: Parameters) -> Result<()> {
        self.query::<()>(sql, params).execute()
    }

    /// Close the connection. Fails while any cursor still holds a statement.
    pub fn close(&self) -> Result<()> {
        self.driver.close()
    }
}
