//! Crate-local error type. Follows `notification_common::errors::ApiError`'s
//! `kind` + backtrace shape so the Sentry middleware and metrics-on-error
//! path work the same way here as they do in the shared crate.

use std::fmt;

use actix_web::http::StatusCode;
use backtrace::Backtrace;
use notification_common::errors::ReportableError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub backtrace: Box<Backtrace>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl<T> From<T> for ApiError
where
    ApiErrorKind: From<T>,
{
    fn from(item: T) -> Self {
        ApiError {
            kind: ApiErrorKind::from(item),
            backtrace: Box::new(Backtrace::new()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiErrorKind {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error")]
    Database(#[from] notification_common::errors::ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] notification_common::db::error::DbError),

    #[error("notification not found")]
    NotificationNotFound,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::NotificationNotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorKind::Storage(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            ApiErrorKind::Validation(_) => "validation_error",
            ApiErrorKind::Database(_) => "database_error",
            ApiErrorKind::Storage(_) => "storage_error",
            ApiErrorKind::NotificationNotFound => "not_found",
            ApiErrorKind::Json(_) => "json_error",
            ApiErrorKind::Reqwest(_) => "reqwest_error",
            ApiErrorKind::Io(_) => "io_error",
            ApiErrorKind::ConfigError(_) => "config_error",
            ApiErrorKind::Internal(_) => "internal_error",
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("status", &self.kind.status().as_u16())?;
        map.serialize_entry("message", &self.kind.to_string())?;
        map.end()
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.kind.status()
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(self)
    }
}

impl ReportableError for ApiError {
    fn is_sentry_event(&self) -> bool {
        !matches!(
            self.kind,
            ApiErrorKind::Validation(_) | ApiErrorKind::NotificationNotFound
        )
    }

    fn metric_label(&self) -> Option<&'static str> {
        Some(self.kind.metric_label())
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        Some(&self.backtrace)
    }
}
