use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Database could not be opened or created
    #[error("Database error: {0}")]
    Database(String),

    /// Filter or find input was rejected, or a query failed
    #[error("Query error: {0}")]
    Query(#[from] marquee_db::QueryError),

    /// Filter file could not be parsed
    #[error("Filter error: {0}")]
    Filter(String),

    /// Settings file error
    #[error("Config error: {0}")]
    Config(String),
}

impl CliError {
    pub(crate) fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub(crate) fn filter(msg: impl Into<String>) -> Self {
        Self::Filter(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
