use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::driver::StatementResult;
use crate::error::SqlScopeError;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns `SqlScopeError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlScopeError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a prepared statement and buffer its outcome.
///
/// Statements that produce columns are read to the end; everything else is executed
/// for its change count.
///
/// # Errors
/// Returns `SqlScopeError::SqliteError` if execution or row extraction fails.
pub fn build_statement_result(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<StatementResult, SqlScopeError> {
    let column_count = stmt.column_count();
    if column_count == 0 {
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(StatementResult::affected(changed));
    }

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();

    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        rows.push(row_values);
    }

    Ok(StatementResult::rows(Arc::new(column_names), rows))
}
