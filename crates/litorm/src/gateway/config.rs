use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_QUEUE_CAPACITY: usize = 64;
const DEFAULT_ROW_BUFFER: usize = 32;
const DEFAULT_MAX_LOGGED_SQL: usize = 200;

/// Configuration for [`SqliteGateway`](super::SqliteGateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Capacity of the command queue in front of the worker.
    pub queue_capacity: usize,
    /// Rows buffered per result stream before the worker waits for the reader.
    pub row_buffer: usize,
    /// SQLite busy timeout.
    pub busy_timeout: Option<Duration>,
    /// Whether to enforce foreign keys (`PRAGMA foreign_keys = ON`).
    pub foreign_keys: bool,
    /// Truncate logged SQL to this many bytes.
    pub max_logged_sql: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            path: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            row_buffer: DEFAULT_ROW_BUFFER,
            busy_timeout: None,
            foreign_keys: true,
            max_logged_sql: DEFAULT_MAX_LOGGED_SQL,
        }
    }
}

impl GatewayConfig {
    /// Create config with defaults (in-memory database).
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a database file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set command queue capacity (clamped to >= 1).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the per-stream row buffer (clamped to >= 1).
    pub fn row_buffer(mut self, rows: usize) -> Self {
        self.row_buffer = rows.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = len;
        self
    }
}
