use std::fmt;
use std::thread;
use std::time::Duration;

use rusqlite::{Connection as RawConnection, ErrorCode};

use crate::config::ConnectParams;
use crate::driver::{Connection, Driver, StatementResult};
use crate::error::SqlScopeError;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

use super::config::{BeginMode, ConnectionSettings};
use super::params::Params;
use super::query::build_statement_result;

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

/// Opens one rusqlite connection per lazy connection. The database path is
/// [`ConnectParams::database`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn connect(&self, params: &ConnectParams) -> Result<SqliteConnection, SqlScopeError> {
        let settings = ConnectionSettings::from_params(params)?;
        let conn = RawConnection::open(&params.database)?;
        conn.busy_timeout(settings.busy_timeout)?;
        // journal_mode reports the resulting mode as a row
        conn.query_row(
            &format!("PRAGMA journal_mode = {}", settings.journal_mode),
            [],
            |_| Ok(()),
        )?;
        tracing::debug!(
            "sqlite connection to '{}' ready (journal_mode={}, busy_timeout={:?}, begin_mode={:?})",
            params.database,
            settings.journal_mode,
            settings.busy_timeout,
            settings.begin_mode
        );
        Ok(SqliteConnection::new(
            conn,
            settings.autocommit,
            settings.begin_mode,
        ))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }
}

/// A rusqlite connection that behaves as if autocommit were off: the first statement
/// after a commit or rollback opens a transaction that lasts until the next one.
pub struct SqliteConnection {
    conn: RawConnection,
    autocommit: bool,
    begin_mode: BeginMode,
}

impl SqliteConnection {
    pub(crate) fn new(conn: RawConnection, autocommit: bool, begin_mode: BeginMode) -> Self {
        Self {
            conn,
            autocommit,
            begin_mode,
        }
    }

    /// The underlying rusqlite handle, for work the query helpers do not cover.
    #[must_use]
    pub fn raw(&self) -> &RawConnection {
        &self.conn
    }

    /// Whether a transaction is currently open on this connection.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    // With the default deferred BEGIN, a transaction that reads and later writes upgrades
    // its lock at the first write. Under WAL that upgrade fails with SQLITE_BUSY at once,
    // ignoring busy_timeout, when another connection committed since the read. Workers
    // doing read-then-write should use `BeginMode::Immediate`.
    fn ensure_transaction(&mut self) -> Result<(), SqlScopeError> {
        if !self.autocommit && self.conn.is_autocommit() {
            self.conn.execute_batch(self.begin_mode.begin_sql())?;
        }
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<StatementResult, SqlScopeError> {
        let converted = Params::convert(params)?;
        self.ensure_transaction()?;
        let mut stmt = self.conn.prepare(sql)?;
        build_statement_result(&mut stmt, converted.as_values())
    }

    fn commit(&mut self) -> Result<(), SqlScopeError> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlScopeError> {
        if self.in_transaction() {
            rollback_with_busy_retries(&self.conn)?;
        }
        Ok(())
    }

    fn close(self) -> Result<(), SqlScopeError> {
        self.conn
            .close()
            .map_err(|(_, err)| SqlScopeError::SqliteError(err))
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.conn.path())
            .field("autocommit", &self.autocommit)
            .field("begin_mode", &self.begin_mode)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

fn rollback_with_busy_retries(conn: &RawConnection) -> Result<(), SqlScopeError> {
    for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
        match conn.execute_batch("ROLLBACK") {
            Ok(()) => return Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::DatabaseBusy
                    && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
            {
                tracing::debug!("rollback busy, retrying in {delay:?}");
                thread::sleep(delay);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(SqlScopeError::ExecutionError(
        "rollback retries exhausted".into(),
    ))
}
