use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlScopeError {
    #[error("Engine is already initialized.")]
    AlreadyInitialized,

    #[error("Engine is not initialized.")]
    NotInitialized,

    #[error("Expect only one column.")]
    MultiColumns,

    #[error("Record has no field '{0}'")]
    FieldNotFound(String),

    #[error("No connection is held by this context")]
    NotConnected,

    #[error("Execution context already holds a connection")]
    AlreadyOpen,

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlScopeError {
    /// Wrap an arbitrary driver error.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SqlScopeError::Driver(Box::new(err))
    }

    /// True for failures reported by (or about) the database itself, as opposed to
    /// lifecycle misuse or configuration problems.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        match self {
            SqlScopeError::MultiColumns
            | SqlScopeError::Driver(_)
            | SqlScopeError::ExecutionError(_) => true,
            #[cfg(feature = "sqlite")]
            SqlScopeError::SqliteError(_) => true,
            _ => false,
        }
    }
}
