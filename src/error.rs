use thiserror::Error;

#[cfg(feature = "sqlite")]
use deadpool_sqlite::rusqlite;

/// Unified error type for every layer of the middleware.
///
/// Driver and pool failures pass through transparently; everything the
/// middleware itself detects is sorted into one of the string variants.
#[derive(Debug, Error)]
pub enum NadoError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool::managed::PoolError<tokio_postgres::Error>),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    PoolErrorSqlite(#[from] deadpool::managed::PoolError<rusqlite::Error>),

    /// Missing or contradictory driver construction parameters.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure to obtain or hold a connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A value that cannot be rendered into SQL text, or a placeholder
    /// count that does not match the parameter list.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Record data rejected before any statement was issued.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Schema registration or row-to-record conversion failure.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// Statement-level failure not raised by a driver type.
    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// Operation not available for this engine or build.
    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

#[cfg(feature = "sqlite")]
impl From<deadpool_sqlite::InteractError> for NadoError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        NadoError::ConnectionError(format!("SQLite interact error: {err}"))
    }
}
