//! Crate-wide error type, following the `autopush-common` shape: a `kind`
//! plus a captured backtrace, with a `ReportableError` trait so the Sentry
//! middleware and the metrics-on-error path can both be driven generically.

use std::fmt;

use backtrace::Backtrace;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::db::error::DbError;

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

#[derive(Debug, Error)]
pub enum ApiErrorKind {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error")]
    Database(#[from] DbError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    MetricError(#[from] cadence::MetricError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error("invalid IANA timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid HH:MM time: {0}")]
    InvalidTimeOfDay(String),

    #[error("general error: {0}")]
    General(String),
}

/// HTTP status code this error would translate to, following
/// `RouterError::status()`'s precedent of centralizing this mapping once.
impl ApiErrorKind {
    pub fn status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiErrorKind::Validation(_)
            | ApiErrorKind::InvalidTimezone(_)
            | ApiErrorKind::InvalidTimeOfDay(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            ApiErrorKind::Validation(_) => "validation_error",
            ApiErrorKind::Database(_) => "database_error",
            ApiErrorKind::Json(_) => "json_error",
            ApiErrorKind::MetricError(_) => "metric_error",
            ApiErrorKind::Io(_) => "io_error",
            ApiErrorKind::ConfigError(_) => "config_error",
            ApiErrorKind::InvalidTimezone(_) => "invalid_timezone",
            ApiErrorKind::InvalidTimeOfDay(_) => "invalid_time_of_day",
            ApiErrorKind::General(_) => "general_error",
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.kind.status()
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(self)
    }
}

/// Implemented by any error that can be fed to the Sentry middleware, so the
/// middleware doesn't need to know about every crate's concrete error type.
pub trait ReportableError: std::fmt::Debug {
    fn reportable_source(&self) -> Option<&(dyn ReportableError + 'static)> {
        None
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        None
    }

    /// Whether this error is interesting enough to forward to Sentry. Errors
    /// that are expected in normal operation (validation failures, not-found)
    /// should return `false` and rely on `metric_label` instead.
    fn is_sentry_event(&self) -> bool {
        true
    }

    fn metric_label(&self) -> Option<&'static str> {
        None
    }

    fn extras(&self) -> Vec<(&str, String)> {
        vec![]
    }

    fn to_sentry_event(&self) -> sentry::protocol::Event<'static> {
        sentry::event_from_error(&SentryCompat(format!("{self:?}")))
    }
}

/// Minimal adapter so `sentry::event_from_error` (which wants a
/// `std::error::Error`) can be fed a `Debug`-only payload derived from a
/// `ReportableError` implementor.
#[derive(Debug)]
struct SentryCompat(String);

impl fmt::Display for SentryCompat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SentryCompat {}

impl ReportableError for ApiError {
    fn is_sentry_event(&self) -> bool {
        !matches!(
            self.kind,
            ApiErrorKind::Validation(_)
                | ApiErrorKind::InvalidTimezone(_)
                | ApiErrorKind::InvalidTimeOfDay(_)
        )
    }

    fn metric_label(&self) -> Option<&'static str> {
        Some(self.kind.metric_label())
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        Some(&self.backtrace)
    }
}

/// A value read with a fail-open fallback, so callers can assert whether the
/// permissive default was actually observed (Design Note 2) instead of the
/// failure being silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback<T> {
    pub value: T,
    pub fallback_used: bool,
}

impl<T> Fallback<T> {
    pub fn ok(value: T) -> Self {
        Fallback {
            value,
            fallback_used: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Fallback {
            value,
            fallback_used: true,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
