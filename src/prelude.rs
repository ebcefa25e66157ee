//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_scope::prelude::*;
//! ```

pub use crate::config::{ConnectParams, EngineOptions};
pub use crate::context::ExecutionContext;
pub use crate::driver::{Connection, Driver};
pub use crate::engine::{Engine, EngineCell, create_engine};
pub use crate::error::SqlScopeError;
pub use crate::id::next_id;
pub use crate::record;
pub use crate::record::Record;
pub use crate::scope::{ConnectionScope, TransactionScope};
pub use crate::types::RowValues;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteDriver, SqliteOptionsBuilder, sqlite_engine};
