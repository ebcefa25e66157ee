use std::fmt::Write;

use rusqlite::types::Value;

use crate::error::SqlScopeError;
use crate::types::RowValues;

// Thread-local buffer for efficient timestamp formatting
thread_local! {
    static TIMESTAMP_BUF: std::cell::RefCell<String> = std::cell::RefCell::new(String::with_capacity(32));
}

/// Convert a single `RowValue` to a rusqlite `Value`.
///
/// # Errors
/// Returns `SqlScopeError::ParameterError` if a timestamp cannot be formatted.
pub fn row_value_to_sqlite_value(value: &RowValues) -> Result<Value, SqlScopeError> {
    Ok(match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => TIMESTAMP_BUF.with(|buf| {
            let mut borrow = buf.borrow_mut();
            borrow.clear();
            write!(borrow, "{}", dt.format("%F %T%.f")).map_err(|e| {
                SqlScopeError::ParameterError(format!("timestamp formatting failed: {e}"))
            })?;
            Ok::<_, SqlScopeError>(Value::Text(borrow.clone()))
        })?,
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    })
}

/// `SQLite` parameter container.
pub struct Params(pub Vec<Value>);

impl Params {
    /// Convert row values into `SQLite` values.
    ///
    /// # Errors
    /// Returns `SqlScopeError::ParameterError` if a value cannot be converted.
    pub fn convert(params: &[RowValues]) -> Result<Self, SqlScopeError> {
        params
            .iter()
            .map(row_value_to_sqlite_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Params)
    }

    /// Borrow the underlying values.
    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }
}
