use std::sync::OnceLock;

use crate::config::{ConnectParams, EngineOptions};
use crate::context::ExecutionContext;
use crate::driver::Driver;
use crate::error::SqlScopeError;

/// Connection factory shared by every worker.
///
/// An `Engine` is built once at startup and then only read, so it can be shared by
/// reference (or behind an `Arc`) across threads. Each worker creates its own
/// [`ExecutionContext`] from it.
pub struct Engine<D: Driver> {
    driver: D,
    params: ConnectParams,
    options: EngineOptions,
}

impl<D: Driver> Engine<D> {
    /// Build an engine. `params` get [`ConnectParams::with_defaults`] applied.
    pub fn new(driver: D, params: ConnectParams, options: EngineOptions) -> Self {
        Self {
            driver,
            params: params.with_defaults(),
            options,
        }
    }

    /// Open a brand new driver connection.
    ///
    /// # Errors
    /// Connection failures propagate as driver errors.
    pub fn connect(&self) -> Result<D::Connection, SqlScopeError> {
        self.driver.connect(&self.params)
    }

    /// A fresh per-worker context bound to this engine.
    #[must_use]
    pub fn context(&self) -> ExecutionContext<'_, D> {
        ExecutionContext::new(self)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }
}

/// Build an [`Engine`] and log its creation.
pub fn create_engine<D: Driver>(
    driver: D,
    params: ConnectParams,
    options: EngineOptions,
) -> Engine<D> {
    let engine = Engine::new(driver, params, options);
    tracing::info!(
        "Init engine for database '{}' on {}:{} ok.",
        engine.params.database,
        engine.params.host,
        engine.params.port
    );
    engine
}

/// Holder for a single process-wide [`Engine`].
///
/// ```rust
/// # #[cfg(feature = "sqlite")] {
/// use sql_scope::{EngineCell, SqlScopeError, sqlite::{SqliteDriver, sqlite_engine}};
///
/// static ENGINE: EngineCell<SqliteDriver> = EngineCell::new();
///
/// ENGINE.init(sqlite_engine("app.db")).unwrap();
/// assert!(matches!(
///     ENGINE.init(sqlite_engine("other.db")),
///     Err(SqlScopeError::AlreadyInitialized)
/// ));
/// # }
/// ```
pub struct EngineCell<D: Driver> {
    cell: OnceLock<Engine<D>>,
}

impl<D: Driver> EngineCell<D> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Store the engine. Only the first call succeeds.
    ///
    /// # Errors
    /// Returns `SqlScopeError::AlreadyInitialized` if an engine is already stored.
    pub fn init(&self, engine: Engine<D>) -> Result<&Engine<D>, SqlScopeError> {
        self.cell
            .set(engine)
            .map_err(|_| SqlScopeError::AlreadyInitialized)?;
        self.get()
    }

    /// # Errors
    /// Returns `SqlScopeError::NotInitialized` before [`EngineCell::init`] succeeded.
    pub fn get(&self) -> Result<&Engine<D>, SqlScopeError> {
        self.cell.get().ok_or(SqlScopeError::NotInitialized)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<D: Driver> Default for EngineCell<D> {
    fn default() -> Self {
        Self::new()
    }
}
