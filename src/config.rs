use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 100;

/// How a connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Open an existing database for reading; writes are rejected.
    ReadOnly,
    /// Open an existing database for reading and writing.
    ReadWrite,
    /// Open for reading and writing, creating the database if missing.
    #[default]
    ReadWriteCreate,
}

/// Connection options for [`crate::drivers::SqliteDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub mode: OpenMode,
    /// How long the engine waits on a locked database before a step fails
    /// with a busy error. `None` fails immediately.
    pub busy_timeout: Option<Duration>,
}

impl ConnectionOptions {
    pub fn new(mode: OpenMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn read_only() -> Self {
        Self::new(OpenMode::ReadOnly)
    }

    pub fn busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            mode: OpenMode::default(),
            busy_timeout: Some(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS)),
        }
    }
}
