// SQLite driver, built on a plain rusqlite connection per worker.
//
// - config: options, the engine builder, and per-connection settings
// - params: parameter conversion between `RowValues` and SQLite types
// - query: result extraction and buffering
// - connection: the `Driver`/`Connection` implementations

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{BeginMode, SqliteOptions, SqliteOptionsBuilder, sqlite_engine};
pub use connection::{SqliteConnection, SqliteDriver};
pub use params::row_value_to_sqlite_value;
pub use query::build_statement_result;
