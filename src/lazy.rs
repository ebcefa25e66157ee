use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::driver::{Connection, Driver, StatementResult};
use crate::engine::Engine;
use crate::error::SqlScopeError;
use crate::record::{ColumnIndex, Record, build_column_index};
use crate::types::RowValues;

// Serial numbers make open/close pairs easy to match up in logs.
static CONNECTION_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A connection that is only established when a cursor is first requested.
pub struct LazyConnection<'e, D: Driver> {
    engine: &'e Engine<D>,
    connection: Option<(u64, D::Connection)>,
}

impl<'e, D: Driver> LazyConnection<'e, D> {
    #[must_use]
    pub fn new(engine: &'e Engine<D>) -> Self {
        Self {
            engine,
            connection: None,
        }
    }

    /// Whether a driver connection is currently held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Return a cursor, connecting first if nothing is held yet.
    ///
    /// # Errors
    /// Propagates the driver's connection error.
    pub fn cursor(&mut self) -> Result<Cursor<'_, D::Connection>, SqlScopeError> {
        if self.connection.is_none() {
            let conn = self.engine.connect()?;
            let serial = CONNECTION_SERIAL.fetch_add(1, Ordering::Relaxed);
            tracing::info!("Open connection <#{serial}>...");
            self.connection = Some((serial, conn));
        }
        let (_, conn) = self.connection.as_mut().ok_or(SqlScopeError::NotConnected)?;
        Ok(Cursor::new(conn))
    }

    /// # Errors
    /// `NotConnected` if nothing is held; otherwise the driver's commit error.
    pub fn commit(&mut self) -> Result<(), SqlScopeError> {
        self.held()?.commit()
    }

    /// # Errors
    /// `NotConnected` if nothing is held; otherwise the driver's rollback error.
    pub fn rollback(&mut self) -> Result<(), SqlScopeError> {
        self.held()?.rollback()
    }

    /// Close and forget the held connection. Calling this with nothing held is a no-op.
    ///
    /// # Errors
    /// Returns the driver's close error; the connection is forgotten either way.
    pub fn release(&mut self) -> Result<(), SqlScopeError> {
        match self.connection.take() {
            Some((serial, conn)) => {
                tracing::info!("Close connection <#{serial}>...");
                conn.close()
            }
            None => Ok(()),
        }
    }

    fn held(&mut self) -> Result<&mut D::Connection, SqlScopeError> {
        self.connection
            .as_mut()
            .map(|(_, conn)| conn)
            .ok_or(SqlScopeError::NotConnected)
    }
}

impl<D: Driver> Drop for LazyConnection<'_, D> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!("closing connection on drop failed: {err}");
        }
    }
}

/// Cursor over one statement at a time on a borrowed connection.
///
/// Results are buffered by the driver, so fetching never touches the database.
pub struct Cursor<'c, C: Connection> {
    conn: &'c mut C,
    columns: Arc<Vec<String>>,
    column_index: ColumnIndex,
    rows: std::vec::IntoIter<Vec<RowValues>>,
    rowcount: Option<usize>,
}

impl<'c, C: Connection> Cursor<'c, C> {
    fn new(conn: &'c mut C) -> Self {
        let columns = Arc::new(Vec::new());
        let column_index = build_column_index(&columns);
        Self {
            conn,
            columns,
            column_index,
            rows: Vec::new().into_iter(),
            rowcount: None,
        }
    }

    /// Run a statement written in the driver's native placeholder syntax, replacing
    /// any previous result on this cursor.
    ///
    /// # Errors
    /// Propagates the driver's error.
    pub fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<(), SqlScopeError> {
        let StatementResult {
            columns,
            rows,
            rows_affected,
        } = self.conn.execute(sql, params)?;
        self.column_index = build_column_index(&columns);
        self.columns = columns;
        self.rows = rows.into_iter();
        self.rowcount = Some(rows_affected);
        Ok(())
    }

    /// Column names of the last result, or `None` if it returned no rows.
    #[must_use]
    pub fn description(&self) -> Option<&Arc<Vec<String>>> {
        if self.columns.is_empty() {
            None
        } else {
            Some(&self.columns)
        }
    }

    /// Rows changed (DML) or returned (queries) by the last statement; `None` before
    /// anything ran.
    #[must_use]
    pub fn rowcount(&self) -> Option<usize> {
        self.rowcount
    }

    pub fn fetch_one(&mut self) -> Option<Vec<RowValues>> {
        self.rows.next()
    }

    pub fn fetch_all(&mut self) -> Vec<Vec<RowValues>> {
        self.rows.by_ref().collect()
    }

    pub fn fetch_one_record(&mut self) -> Option<Record> {
        let values = self.rows.next()?;
        Some(self.to_record(values))
    }

    pub fn fetch_all_records(&mut self) -> Vec<Record> {
        let rows: Vec<_> = self.rows.by_ref().collect();
        rows.into_iter()
            .map(|values| self.to_record(values))
            .collect()
    }

    fn to_record(&self, values: Vec<RowValues>) -> Record {
        Record::with_index(
            Arc::clone(&self.columns),
            Arc::clone(&self.column_index),
            values,
        )
    }
}
