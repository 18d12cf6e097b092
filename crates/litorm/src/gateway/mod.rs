//! Execution gateway.
//!
//! A [`Gateway`] is the only place built statements are executed. It accepts
//! a [`BuiltStatement`] (never raw SQL) and returns either an [`ExecResult`]
//! or a lazily consumed [`RowStream`].
//!
//! [`SqliteGateway`] is the bundled implementation: one SQLite connection
//! owned by a worker thread, fed through a bounded command queue.

mod config;
mod sqlite;
mod stream;

pub use config::GatewayConfig;
pub use sqlite::SqliteGateway;
pub use stream::{FromRowStream, RowStream};

use crate::builder::BuiltStatement;
use crate::error::OrmResult;

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Row identifier assigned by an INSERT.
    pub inserted_id: Option<i64>,
}

/// Executes built statements against a storage back end.
///
/// Storage failures are returned as [`OrmError::Storage`](crate::OrmError::Storage)
/// without reinterpretation. Retry policy, if any, belongs to the implementor.
pub trait Gateway: Send + Sync {
    /// Run a statement that does not return rows.
    fn execute(
        &self,
        statement: BuiltStatement,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send;

    /// Run a statement and stream its rows.
    fn query(
        &self,
        statement: BuiltStatement,
    ) -> impl std::future::Future<Output = OrmResult<RowStream>> + Send;
}

/// Truncate `sql` to at most `max_bytes` on a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
