//! SQLite gateway backed by a dedicated worker thread.
//!
//! The worker owns the only `rusqlite::Connection`. Callers send commands over
//! a bounded queue and wait for the reply on a oneshot channel, so concurrent
//! statements are queued and run one at a time. Query rows flow back through
//! a bounded channel while the worker steps the statement; a reader that is
//! slower than the worker applies backpressure.
//!
//! A row stream keeps the worker busy until it is exhausted or dropped.
//! Finish or drop it before issuing the next statement from the same task.

use std::sync::Arc;
use std::time::Instant;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use tokio::sync::{mpsc, oneshot};

use super::{ExecResult, Gateway, GatewayConfig, RowStream, truncate_sql_bytes};
use crate::builder::{BuiltStatement, StatementKind};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Integer(v) => ValueRef::Integer(*v),
            Value::Real(v) => ValueRef::Real(*v),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

enum Command {
    Execute {
        statement: BuiltStatement,
        resp: oneshot::Sender<OrmResult<ExecResult>>,
    },
    Query {
        statement: BuiltStatement,
        rows: mpsc::Sender<OrmResult<Row>>,
        resp: oneshot::Sender<OrmResult<()>>,
    },
    Close {
        resp: oneshot::Sender<OrmResult<()>>,
    },
}

/// Gateway over a single SQLite connection.
///
/// Cheap to clone; all clones feed the same worker. The worker stops when
/// [`close`](SqliteGateway::close) is called or every clone is dropped.
#[derive(Clone)]
pub struct SqliteGateway {
    cmd_tx: mpsc::Sender<Command>,
    config: Arc<GatewayConfig>,
}

impl SqliteGateway {
    /// Open a private in-memory database with default settings.
    pub fn open_in_memory() -> OrmResult<Self> {
        Self::open(GatewayConfig::default())
    }

    /// Open the configured database and start the worker.
    pub fn open(config: GatewayConfig) -> OrmResult<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        if let Some(timeout) = config.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON")?;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_capacity.max(1));
        let config = Arc::new(config);
        let worker_config = Arc::clone(&config);
        std::thread::Builder::new()
            .name("litorm-sqlite".to_string())
            .spawn(move || run_worker(conn, cmd_rx, &worker_config))
            .map_err(|e| OrmError::Connection(format!("failed to start sqlite worker: {e}")))?;

        tracing::info!(
            target: "litorm.sql",
            path = ?config.path,
            queue_capacity = config.queue_capacity,
            "sqlite gateway started"
        );

        Ok(Self { cmd_tx, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run every registered table's `CREATE TABLE IF NOT EXISTS`.
    pub async fn create_tables(&self, registry: &crate::registry::Registry) -> OrmResult<()> {
        for statement in registry.create_statements()? {
            self.execute(statement).await?;
        }
        Ok(())
    }

    /// Stop the worker and close the connection.
    ///
    /// Statements already queued run first. Calls after close fail with a
    /// connection error.
    pub async fn close(&self) -> OrmResult<()> {
        send_command(&self.cmd_tx, |resp| Command::Close { resp }).await
    }

    fn log_statement(&self, statement: &BuiltStatement) {
        tracing::debug!(
            target: "litorm.sql",
            kind = statement.kind().as_str(),
            table = statement.table(),
            params = statement.params().len(),
            sql = truncate_sql_bytes(statement.sql(), self.config.max_logged_sql),
            "statement"
        );
    }
}

impl std::fmt::Debug for SqliteGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteGateway")
            .field("config", &self.config)
            .field("closed", &self.cmd_tx.is_closed())
            .finish()
    }
}

impl Gateway for SqliteGateway {
    fn execute(
        &self,
        statement: BuiltStatement,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        self.log_statement(&statement);
        async move { send_command(&self.cmd_tx, |resp| Command::Execute { statement, resp }).await }
    }

    fn query(
        &self,
        statement: BuiltStatement,
    ) -> impl std::future::Future<Output = OrmResult<RowStream>> + Send {
        self.log_statement(&statement);
        async move {
            let (rows_tx, rows_rx) = mpsc::channel(self.config.row_buffer.max(1));
            send_command(&self.cmd_tx, |resp| Command::Query {
                statement,
                rows: rows_tx,
                resp,
            })
            .await?;
            Ok(RowStream::from_receiver(rows_rx))
        }
    }
}

async fn send_command<T, F>(cmd_tx: &mpsc::Sender<Command>, build: F) -> OrmResult<T>
where
    F: FnOnce(oneshot::Sender<OrmResult<T>>) -> Command,
{
    let (resp_tx, resp_rx) = oneshot::channel();
    cmd_tx
        .send(build(resp_tx))
        .await
        .map_err(|_| OrmError::Connection("gateway command channel is closed".to_string()))?;
    resp_rx.await.map_err(|_| {
        OrmError::Connection("gateway worker closed before command reply".to_string())
    })?
}

fn run_worker(conn: Connection, mut cmd_rx: mpsc::Receiver<Command>, config: &GatewayConfig) {
    let mut close_resp = None;

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            Command::Execute { statement, resp } => {
                let result = run_execute(&conn, &statement);
                log_failure(&statement, config, result.as_ref().err());
                let _ = resp.send(result);
            }
            Command::Query {
                statement,
                rows,
                resp,
            } => run_query(&conn, &statement, config, &rows, resp),
            Command::Close { resp } => {
                close_resp = Some(resp);
                break;
            }
        }
    }

    // Stop accepting commands; anything still queued gets a closed-channel
    // error on its reply.
    cmd_rx.close();
    let result = conn.close().map_err(|(_, e)| OrmError::from(e));
    tracing::debug!(target: "litorm.sql", ok = result.is_ok(), "sqlite gateway stopped");
    if let Some(resp) = close_resp {
        let _ = resp.send(result);
    }
}

fn bind_params(statement: &BuiltStatement) -> Vec<&dyn ToSql> {
    statement.params().iter().map(|p| p as &dyn ToSql).collect()
}

fn run_execute(conn: &Connection, statement: &BuiltStatement) -> OrmResult<ExecResult> {
    if statement.kind().returns_rows() {
        return Err(OrmError::query(format!(
            "{} statement on '{}' returns rows; use query()",
            statement.kind().as_str(),
            statement.table()
        )));
    }

    let started = Instant::now();
    let mut stmt = conn.prepare_cached(statement.sql())?;
    let params = bind_params(statement);
    let affected = stmt.execute(params.as_slice())?;
    let inserted_id =
        (statement.kind() == StatementKind::Insert).then(|| conn.last_insert_rowid());

    tracing::trace!(
        target: "litorm.sql",
        rows_affected = affected,
        elapsed_us = started.elapsed().as_micros() as u64,
        "executed"
    );

    Ok(ExecResult {
        rows_affected: affected as u64,
        inserted_id,
    })
}

fn run_query(
    conn: &Connection,
    statement: &BuiltStatement,
    config: &GatewayConfig,
    rows_tx: &mpsc::Sender<OrmResult<Row>>,
    resp: oneshot::Sender<OrmResult<()>>,
) {
    let mut stmt = match conn.prepare_cached(statement.sql()) {
        Ok(stmt) => stmt,
        Err(e) => {
            let err = OrmError::from(e);
            log_failure(statement, config, Some(&err));
            let _ = resp.send(Err(err));
            return;
        }
    };
    let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();

    let params = bind_params(statement);
    let mut rows = match stmt.query(params.as_slice()) {
        Ok(rows) => rows,
        Err(e) => {
            let err = OrmError::from(e);
            log_failure(statement, config, Some(&err));
            let _ = resp.send(Err(err));
            return;
        }
    };
    if resp.send(Ok(())).is_err() {
        return;
    }

    let mut sent = 0usize;
    loop {
        let item = match rows.next() {
            Ok(Some(row)) => read_row(row, &columns),
            Ok(None) => break,
            Err(e) => Err(OrmError::from(e)),
        };
        let failed = item.is_err();
        if let Err(err) = &item {
            log_failure(statement, config, Some(err));
        }
        // The reader dropped the stream.
        if rows_tx.blocking_send(item).is_err() || failed {
            break;
        }
        sent += 1;
    }

    tracing::trace!(target: "litorm.sql", rows = sent, "query finished");
}

fn read_row(row: &rusqlite::Row<'_>, columns: &Arc<[String]>) -> OrmResult<Row> {
    let mut values = Vec::with_capacity(columns.len());
    for idx in 0..columns.len() {
        values.push(Value::from(row.get_ref(idx)?));
    }
    Ok(Row::new(Arc::clone(columns), values))
}

fn log_failure(statement: &BuiltStatement, config: &GatewayConfig, err: Option<&OrmError>) {
    if let Some(err) = err {
        tracing::warn!(
            target: "litorm.sql",
            kind = statement.kind().as_str(),
            table = statement.table(),
            sql = truncate_sql_bytes(statement.sql(), config.max_logged_sql),
            error = %err,
            "statement failed"
        );
    }
}
