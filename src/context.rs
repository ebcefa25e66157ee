use crate::driver::Driver;
use crate::engine::Engine;
use crate::error::SqlScopeError;
use crate::lazy::{Cursor, LazyConnection};
use crate::scope::{ConnectionScope, TransactionScope, settle};

/// Per-worker connection state: at most one lazy connection plus the transaction
/// nesting depth.
///
/// A context belongs to exactly one worker. It is only ever used through `&mut`, so
/// nothing in it needs locking; share the [`Engine`] instead and give every thread
/// its own context.
///
/// Invariant: `transaction_depth() > 0` implies `is_open()`.
pub struct ExecutionContext<'e, D: Driver> {
    engine: &'e Engine<D>,
    connection: Option<LazyConnection<'e, D>>,
    transaction_depth: usize,
}

impl<'e, D: Driver> ExecutionContext<'e, D> {
    #[must_use]
    pub fn new(engine: &'e Engine<D>) -> Self {
        Self {
            engine,
            connection: None,
            transaction_depth: 0,
        }
    }

    pub fn engine(&self) -> &'e Engine<D> {
        self.engine
    }

    /// Whether a lazy connection is held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Attach a fresh lazy connection. No database work happens until the first cursor.
    ///
    /// # Errors
    /// Returns `SqlScopeError::AlreadyOpen` if a connection is already held.
    pub fn open(&mut self) -> Result<(), SqlScopeError> {
        if self.is_open() {
            return Err(SqlScopeError::AlreadyOpen);
        }
        tracing::debug!("open lazy connection...");
        self.connection = Some(LazyConnection::new(self.engine));
        self.transaction_depth = 0;
        Ok(())
    }

    /// Release the lazy connection (closing the driver connection if one was made) and
    /// reset the transaction state. A no-op when nothing is held.
    ///
    /// # Errors
    /// Returns the driver's close error; the context is reset either way.
    pub fn close(&mut self) -> Result<(), SqlScopeError> {
        let result = match self.connection.take() {
            Some(mut lazy) => {
                tracing::debug!("close lazy connection...");
                lazy.release()
            }
            None => Ok(()),
        };
        self.transaction_depth = 0;
        result
    }

    /// Cursor on the held connection, connecting on first use.
    ///
    /// # Errors
    /// `NotConnected` if the context is not open; otherwise the driver's connect error.
    pub fn cursor(&mut self) -> Result<Cursor<'_, D::Connection>, SqlScopeError> {
        self.lazy_mut()?.cursor()
    }

    /// Number of currently active (possibly nested) transaction scopes.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transaction_depth
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction_depth > 0
    }

    /// Run `f` inside a [`ConnectionScope`]. The connection is released afterwards
    /// only if this call opened it.
    ///
    /// # Errors
    /// Returns `f`'s error unchanged. If `f` succeeded but releasing the connection
    /// failed, returns the release error.
    pub fn with_connection<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SqlScopeError>,
    {
        let mut scope = ConnectionScope::enter(self)?;
        let result = f(&mut *scope);
        let exited = scope.exit();
        settle(result, exited)
    }

    /// Run `f` inside a [`TransactionScope`].
    ///
    /// `Ok` from `f` commits (when this is the outermost scope), `Err` rolls back. An
    /// error from `f` is always returned unchanged, even if the rollback also failed.
    ///
    /// ```rust
    /// # #[cfg(feature = "sqlite")]
    /// # fn demo() -> Result<(), sql_scope::SqlScopeError> {
    /// use sql_scope::{RowValues, SqlScopeError, sqlite::sqlite_engine};
    ///
    /// let engine = sqlite_engine("app.db");
    /// let mut ctx = engine.context();
    /// ctx.transaction(|ctx| {
    ///     ctx.update("update user set name=? where id=?", &["Bob".into(), RowValues::Int(1)])?;
    ///     ctx.transaction(|ctx| {
    ///         // joins the outer transaction; nothing is committed here
    ///         ctx.update("delete from session where user_id=?", &[RowValues::Int(1)])
    ///     })?;
    ///     Ok::<_, SqlScopeError>(())
    /// })
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns `f`'s error, or the commit error if committing failed.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<SqlScopeError>,
    {
        let mut tx = TransactionScope::begin(self)?;
        let result = f(&mut *tx);
        let finished = if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        };
        settle(result, finished)
    }

    pub(crate) fn lazy_mut(&mut self) -> Result<&mut LazyConnection<'e, D>, SqlScopeError> {
        self.connection.as_mut().ok_or(SqlScopeError::NotConnected)
    }

    pub(crate) fn enter_transaction(&mut self) -> usize {
        self.transaction_depth += 1;
        self.transaction_depth
    }

    pub(crate) fn leave_transaction(&mut self) -> usize {
        self.transaction_depth = self.transaction_depth.saturating_sub(1);
        self.transaction_depth
    }
}
