//! Lazy per-worker database connections, nestable transaction scopes, and a small
//! record-returning query API.
//!
//! Build one [`Engine`] at startup, give every worker its own [`ExecutionContext`],
//! and run statements through the query helpers. A connection is only opened when the
//! first statement runs and is released when the outermost scope ends.
//!
//! ```rust,no_run
//! # #[cfg(feature = "sqlite")]
//! # fn demo() -> Result<(), sql_scope::SqlScopeError> {
//! use sql_scope::{RowValues, SqlScopeError, next_id, record, sqlite::sqlite_engine};
//!
//! let engine = sqlite_engine("app.db");
//! let mut ctx = engine.context();
//! ctx.transaction(|ctx| {
//!     ctx.insert("user", &record! { "id" => next_id(), "name" => "Alice" })?;
//!     let users = ctx.select_all("select * from user where name=?", &["Alice".into()])?;
//!     assert_eq!(users.len(), 1);
//!     Ok::<_, SqlScopeError>(())
//! })?;
//! let count = ctx.select_int("select count(*) from user", &[])?;
//! assert_eq!(count, Some(RowValues::Int(1)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod driver;
pub mod engine;
pub mod error;
pub mod id;
pub mod lazy;
pub mod prelude;
mod query;
pub mod record;
pub mod scope;
pub mod translation;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{ConnectParams, EngineOptions, SAFE_DEFAULTS};
pub use context::ExecutionContext;
pub use driver::{Connection, Driver, StatementResult};
pub use engine::{Engine, EngineCell, create_engine};
pub use error::SqlScopeError;
pub use id::{ID_LEN, next_id, next_id_at};
pub use lazy::{Cursor, LazyConnection};
pub use record::Record;
pub use scope::{ConnectionScope, TransactionScope};
pub use translation::{PlaceholderStyle, translate_placeholders};
pub use types::RowValues;
