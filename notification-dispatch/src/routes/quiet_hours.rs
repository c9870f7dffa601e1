//! `GetQuietHours` / `UpdateQuietHours` (§6).
use actix_web::{web, HttpResponse};
use notification_common::quiet_hours::{is_valid_time_of_day, is_valid_timezone, QuietHoursConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ApiErrorKind, ApiResult};
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHoursQuery {
    pub tenant_id: String,
    pub account_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHoursResponseBody {
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
}

impl From<QuietHoursConfig> for QuietHoursResponseBody {
    fn from(c: QuietHoursConfig) -> Self {
        QuietHoursResponseBody {
            enabled: c.enabled,
            start_time: c.start_time,
            end_time: c.end_time,
            timezone: c.timezone,
        }
    }
}

pub async fn get_quiet_hours(
    state: web::Data<ServerState>,
    query: web::Query<QuietHoursQuery>,
) -> ApiResult<HttpResponse> {
    let config = state
        .quiet_hours
        .get_config(&query.tenant_id, &query.account_id)
        .await
        .map_err(|e| ApiErrorKind::Internal(e.to_string()))?
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(QuietHoursResponseBody::from(config)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuietHoursBody {
    pub tenant_id: String,
    pub account_id: String,
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuietHoursResponseBody {
    pub success: bool,
    pub message: String,
}

pub async fn update_quiet_hours(
    state: web::Data<ServerState>,
    body: web::Json<UpdateQuietHoursBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();

    if !is_valid_timezone(&body.timezone) {
        return Err(ApiErrorKind::Validation(format!("invalid timezone: {}", body.timezone)).into());
    }
    if !is_valid_time_of_day(&body.start_time) {
        return Err(ApiErrorKind::Validation(format!("invalid startTime: {}", body.start_time)).into());
    }
    if !is_valid_time_of_day(&body.end_time) {
        return Err(ApiErrorKind::Validation(format!("invalid endTime: {}", body.end_time)).into());
    }

    let config = QuietHoursConfig {
        enabled: body.enabled,
        start_time: body.start_time,
        end_time: body.end_time,
        timezone: body.timezone,
    };

    state
        .quiet_hours
        .set_config(&body.tenant_id, &body.account_id, &config)
        .await
        .map_err(|e| ApiErrorKind::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(UpdateQuietHoursResponseBody {
        success: true,
        message: "quiet hours updated".to_string(),
    }))
}
