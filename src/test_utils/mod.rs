//! An in-process [`Driver`] that records what the scopes do to it.
//!
//! Counts connects, commits, rollbacks, and closes, logs every executed statement,
//! and hands back scripted results or failures. Useful for asserting scope semantics
//! without a database.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{ConnectParams, EngineOptions};
use crate::driver::{Connection, Driver, StatementResult};
use crate::engine::Engine;
use crate::error::SqlScopeError;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Lifecycle counters for a [`RecordingDriver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub connects: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
    pub statements: usize,
}

impl DriverStats {
    /// Connections opened and not yet closed.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.connects.saturating_sub(self.closes)
    }
}

/// A statement as the driver received it, after placeholder translation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    /// 1-based number of the connection it ran on.
    pub connection: usize,
    pub sql: String,
    pub params: Vec<RowValues>,
}

#[derive(Debug)]
enum Scripted {
    Result(StatementResult),
    Error(String),
}

#[derive(Debug, Default)]
struct Recorder {
    stats: DriverStats,
    executed: Vec<ExecutedStatement>,
    scripted: VecDeque<Scripted>,
    fail_next_connect: bool,
    fail_next_commit: bool,
    fail_next_close: bool,
}

/// Recording driver. Clones share the same recorder.
#[derive(Debug, Clone)]
pub struct RecordingDriver {
    state: Arc<Mutex<Recorder>>,
    style: PlaceholderStyle,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDriver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(Recorder::default())),
            style: PlaceholderStyle::Format,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// Engine over a clone of this driver with default options.
    #[must_use]
    pub fn engine(&self) -> Engine<Self> {
        self.engine_with(EngineOptions::default())
    }

    #[must_use]
    pub fn engine_with(&self, options: EngineOptions) -> Engine<Self> {
        Engine::new(self.clone(), ConnectParams::new("recording"), options)
    }

    #[must_use]
    pub fn stats(&self) -> DriverStats {
        self.lock().stats
    }

    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.lock().executed.clone()
    }

    /// SQL text of every executed statement, in order.
    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.lock().executed.iter().map(|s| s.sql.clone()).collect()
    }

    /// Queue a row-returning result for the next unscripted statement.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<RowValues>>) {
        let columns = Arc::new(columns.iter().map(|c| (*c).to_string()).collect());
        self.push(Scripted::Result(StatementResult::rows(columns, rows)));
    }

    /// Queue a change count for the next statement.
    pub fn push_affected(&self, rows_affected: usize) {
        self.push(Scripted::Result(StatementResult::affected(rows_affected)));
    }

    /// Make the next statement fail with `SqlScopeError::ExecutionError(message)`.
    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Scripted::Error(message.into()));
    }

    pub fn fail_next_connect(&self) {
        self.lock().fail_next_connect = true;
    }

    pub fn fail_next_commit(&self) {
        self.lock().fail_next_commit = true;
    }

    pub fn fail_next_close(&self) {
        self.lock().fail_next_close = true;
    }

    fn push(&self, scripted: Scripted) {
        self.lock().scripted.push_back(scripted);
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<Recorder>) -> MutexGuard<'_, Recorder> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Driver for RecordingDriver {
    type Connection = RecordingConnection;

    fn connect(&self, _params: &ConnectParams) -> Result<RecordingConnection, SqlScopeError> {
        let mut rec = self.lock();
        if std::mem::take(&mut rec.fail_next_connect) {
            return Err(SqlScopeError::driver(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        rec.stats.connects += 1;
        Ok(RecordingConnection {
            id: rec.stats.connects,
            state: Arc::clone(&self.state),
        })
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }
}

/// Connection handed out by [`RecordingDriver`].
#[derive(Debug)]
pub struct RecordingConnection {
    id: usize,
    state: Arc<Mutex<Recorder>>,
}

impl RecordingConnection {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Connection for RecordingConnection {
    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<StatementResult, SqlScopeError> {
        let mut rec = lock(&self.state);
        rec.stats.statements += 1;
        rec.executed.push(ExecutedStatement {
            connection: self.id,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match rec.scripted.pop_front() {
            Some(Scripted::Result(result)) => Ok(result),
            Some(Scripted::Error(message)) => Err(SqlScopeError::ExecutionError(message)),
            None => Ok(StatementResult::default()),
        }
    }

    fn commit(&mut self) -> Result<(), SqlScopeError> {
        let mut rec = lock(&self.state);
        rec.stats.commits += 1;
        if std::mem::take(&mut rec.fail_next_commit) {
            return Err(SqlScopeError::ExecutionError("commit rejected".into()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlScopeError> {
        lock(&self.state).stats.rollbacks += 1;
        Ok(())
    }

    fn close(self) -> Result<(), SqlScopeError> {
        let mut rec = lock(&self.state);
        rec.stats.closes += 1;
        if std::mem::take(&mut rec.fail_next_close) {
            return Err(SqlScopeError::ExecutionError("close failed".into()));
        }
        Ok(())
    }
}
