use std::time::{Duration, Instant};

use crate::context::ExecutionContext;
use crate::driver::Driver;
use crate::error::SqlScopeError;
use crate::lazy::Cursor;
use crate::record::Record;
use crate::translation::translate_placeholders;
use crate::types::RowValues;

/// Query helpers. Each one runs inside a [`ConnectionScope`](crate::ConnectionScope),
/// so it works on its own (opening and closing a connection) or inside an enclosing
/// connection or transaction scope (reusing that connection).
///
/// SQL uses `?` for positional parameters.
impl<'e, D: Driver> ExecutionContext<'e, D> {
    /// First row of the result, or `None` when nothing matched.
    ///
    /// # Errors
    /// Propagates connection and driver errors.
    pub fn select_one(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Record>, SqlScopeError> {
        self.with_connection(|ctx| {
            let mut cursor = ctx.execute_logged(sql, params)?;
            Ok(cursor.fetch_one_record())
        })
    }

    /// Single value from a one-column result: the first row's value, or `None` when
    /// nothing matched.
    ///
    /// # Errors
    /// `SqlScopeError::MultiColumns` unless the result has exactly one column, whatever
    /// the row count. Otherwise propagates connection and driver errors.
    pub fn select_int(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<RowValues>, SqlScopeError> {
        self.with_connection(|ctx| {
            let mut cursor = ctx.execute_logged(sql, params)?;
            if cursor.description().map_or(0, |cols| cols.len()) != 1 {
                return Err(SqlScopeError::MultiColumns);
            }
            Ok(cursor.fetch_one().and_then(|row| row.into_iter().next()))
        })
    }

    /// Every row of the result; empty when nothing matched.
    ///
    /// # Errors
    /// Propagates connection and driver errors.
    pub fn select_all(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<Record>, SqlScopeError> {
        self.with_connection(|ctx| {
            let mut cursor = ctx.execute_logged(sql, params)?;
            Ok(cursor.fetch_all_records())
        })
    }

    /// Insert one row built from `fields`, in field order. Returns the affected row
    /// count.
    ///
    /// Outside a transaction the row is committed immediately; inside one it lands
    /// with the enclosing transaction's commit.
    ///
    /// # Errors
    /// `SqlScopeError::ParameterError` for an empty record; otherwise propagates
    /// connection and driver errors (e.g. a duplicate key).
    pub fn insert(&mut self, table: &str, fields: &Record) -> Result<usize, SqlScopeError> {
        if fields.is_empty() {
            return Err(SqlScopeError::ParameterError(format!(
                "insert into '{table}' needs at least one field"
            )));
        }
        let driver = self.engine().driver();
        let columns = fields
            .columns()
            .iter()
            .map(|col| driver.quote_identifier(col))
            .collect::<Vec<_>>()
            .join(",");
        let markers = vec!["?"; fields.len()].join(",");
        let sql = format!(
            "insert into {} ({columns}) values ({markers})",
            driver.quote_identifier(table)
        );
        self.update(&sql, fields.values())
    }

    /// Execute DML and return the affected row count.
    ///
    /// Outside a transaction the change is committed immediately; inside one it lands
    /// with the enclosing transaction's commit.
    ///
    /// # Errors
    /// Propagates connection, driver, and auto-commit errors.
    pub fn update(&mut self, sql: &str, params: &[RowValues]) -> Result<usize, SqlScopeError> {
        self.with_connection(|ctx| {
            let affected = ctx
                .execute_logged(sql, params)?
                .rowcount()
                .unwrap_or_default();
            if !ctx.in_transaction() {
                tracing::info!("auto commit");
                ctx.lazy_mut()?.commit()?;
            }
            Ok(affected)
        })
    }

    fn execute_logged(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Cursor<'_, D::Connection>, SqlScopeError> {
        let engine = self.engine();
        let options = engine.options();
        let sql = translate_placeholders(
            sql,
            engine.driver().placeholder_style(),
            options.translate_placeholders,
        );
        tracing::info!("SQL: {}, ARGS: {:?}", sql, params);

        let mut cursor = self.cursor()?;
        let start = Instant::now();
        cursor.execute(&sql, params)?;
        profiling(start.elapsed(), &sql, options.slow_query_threshold);
        Ok(cursor)
    }
}

fn profiling(elapsed: Duration, sql: &str, threshold: Duration) {
    let secs = elapsed.as_secs_f64();
    if elapsed > threshold {
        tracing::warn!("[PROFILING] [DB] {secs:.6}: {sql}");
    } else {
        tracing::info!("[PROFILING] [DB] {secs:.6}: {sql}");
    }
}
