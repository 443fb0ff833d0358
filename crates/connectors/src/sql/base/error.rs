use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low‐level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PostgreSQL driver error.
    #[error("Postgres error: {0}")]
    PgError(#[from] tokio_postgres::Error),

    /// A row came back in a shape we could not decode.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Writing rows to the database failed at the application level.
    #[error("Write error: {0}")]
    Write(String),

    /// The store refused or could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An error occurred while building a SQL query.
    #[error("Query build error: {0}")]
    QueryBuildError(String),
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Postgres connection failed: {0}")]
    Connection(#[from] tokio_postgres::Error),

    #[error("TLS configuration failed: {0}")]
    TlsConfig(#[from] native_tls::Error),
}
