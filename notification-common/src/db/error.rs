use backtrace::Backtrace;
use thiserror::Error;

use crate::errors::ReportableError;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Error while performing (de)serialization: {0}")]
    Serialization(String),

    #[error("Connection failure: {0}")]
    ConnectionError(String),

    #[error("the conditional write failed: row already exists")]
    Conditional,

    #[error("Database integrity error: {0}")]
    Integrity(String),

    #[error("Unknown Database Error: {0}")]
    General(String),

    /// Returned by a storage driver that's temporarily overloaded; callers
    /// should surface a 503 rather than a hard failure.
    #[error("Process pending, please wait.")]
    Backoff(String),
}

impl DbError {
    pub fn status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            DbError::Backoff(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ReportableError for DbError {
    fn backtrace(&self) -> Option<&Backtrace> {
        None
    }

    fn is_sentry_event(&self) -> bool {
        false
    }

    fn metric_label(&self) -> Option<&'static str> {
        match self {
            DbError::Backoff(_) => Some("storage.error.backoff"),
            DbError::Conditional => Some("storage.error.conditional"),
            _ => None,
        }
    }

    fn extras(&self) -> Vec<(&str, String)> {
        match self {
            DbError::Backoff(e) => vec![("raw", e.to_string())],
            DbError::Integrity(row) => vec![("row", row.clone())],
            _ => vec![],
        }
    }
}
