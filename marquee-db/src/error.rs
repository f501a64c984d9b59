use marquee_core::ValidationError;
use rusqlite::types::Value;
use thiserror::Error;

/// Errors surfaced by filter construction and query execution.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Bad filter or find input; no SQL was executed
    #[error("invalid filter: {0}")]
    Validation(#[from] ValidationError),

    /// A statement failed; carries the statement and its bound arguments
    #[error("executing query `{sql}` with args {args:?}: {source}")]
    Execution {
        sql: String,
        args: Vec<Value>,
        #[source]
        source: rusqlite::Error,
    },

    /// The caller cancelled the operation before it completed
    #[error("query cancelled")]
    Cancelled,

    /// Hydration found no row for an id returned by the query
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

impl QueryError {
    pub fn execution(sql: &str, args: &[Value], source: rusqlite::Error) -> Self {
        Self::Execution {
            sql: sql.to_string(),
            args: args.to_vec(),
            source,
        }
    }

    /// The validation error, when this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}
