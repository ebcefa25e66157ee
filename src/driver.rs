//! The capability surface this crate needs from a database client.
//!
//! A [`Driver`] knows how to open a [`Connection`] from [`ConnectParams`]; a connection
//! executes one statement at a time and hands back a fully buffered [`StatementResult`].
//! Everything above this seam (lazy acquisition, scopes, the query helpers) is
//! driver-agnostic.

use std::sync::Arc;

use crate::config::ConnectParams;
use crate::error::SqlScopeError;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Buffered outcome of a single statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    /// Column names, empty for statements that return no rows.
    pub columns: Arc<Vec<String>>,
    /// Every row the statement produced, in driver order.
    pub rows: Vec<Vec<RowValues>>,
    /// Rows changed by DML, or rows returned by a query.
    pub rows_affected: usize,
}

impl StatementResult {
    /// Result of a row-returning statement.
    #[must_use]
    pub fn rows(columns: Arc<Vec<String>>, rows: Vec<Vec<RowValues>>) -> Self {
        let rows_affected = rows.len();
        Self {
            columns,
            rows,
            rows_affected,
        }
    }

    /// Result of a statement that only reports a change count.
    #[must_use]
    pub fn affected(rows_affected: usize) -> Self {
        Self {
            columns: Arc::new(Vec::new()),
            rows: Vec::new(),
            rows_affected,
        }
    }

    #[must_use]
    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// A live driver connection with autocommit disabled.
///
/// Statements run inside an implicit transaction that lasts until `commit` or
/// `rollback`.
pub trait Connection {
    /// Execute one statement written in the driver's native placeholder syntax.
    ///
    /// # Errors
    /// Driver errors (syntax, constraint, connectivity) are returned untranslated.
    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<StatementResult, SqlScopeError>;

    /// # Errors
    /// Returns the driver's error if the commit is rejected.
    fn commit(&mut self) -> Result<(), SqlScopeError>;

    /// # Errors
    /// Returns the driver's error if the rollback fails.
    fn rollback(&mut self) -> Result<(), SqlScopeError>;

    /// Close the connection, discarding any uncommitted work.
    ///
    /// # Errors
    /// Returns the driver's error if the connection could not be closed cleanly.
    fn close(self) -> Result<(), SqlScopeError>
    where
        Self: Sized;
}

/// Connection factory for one kind of database.
pub trait Driver {
    type Connection: Connection;

    /// Open a new connection.
    ///
    /// # Errors
    /// Connection failures propagate as driver errors.
    fn connect(&self, params: &ConnectParams) -> Result<Self::Connection, SqlScopeError>;

    /// Positional-parameter syntax the driver understands.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Quote a table or column name for use in generated SQL. Defaults to ANSI
    /// double quotes with embedded quotes doubled.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}
