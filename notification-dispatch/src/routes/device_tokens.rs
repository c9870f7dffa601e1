//! `RegisterDeviceToken` / `UnregisterDeviceToken` / `GetDeviceTokens` (§6).
use std::collections::HashMap;
use std::str::FromStr;

use actix_web::{web, HttpResponse};
use notification_common::enums::Platform;
use serde::{Deserialize, Serialize};

use crate::error::{ApiErrorKind, ApiResult};
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceTokenBody {
    pub tenant_id: String,
    pub account_id: String,
    pub token: String,
    pub platform: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_info: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceTokenResponseBody {
    pub success: bool,
    pub device_token_id: String,
    pub message: String,
}

pub async fn register_device_token(
    state: web::Data<ServerState>,
    body: web::Json<RegisterDeviceTokenBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    if body.token.trim().is_empty() {
        return Err(ApiErrorKind::Validation("token is required".to_string()).into());
    }
    let platform = Platform::from_str(&body.platform)
        .map_err(|_| ApiErrorKind::Validation(format!("unknown platform: {}", body.platform)))?;

    let device_token_id = state
        .device_tokens
        .register(
            &body.tenant_id,
            &body.account_id,
            &body.token,
            platform,
            body.device_id,
            Some(body.device_info),
        )
        .await
        .map_err(|e| ApiErrorKind::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(RegisterDeviceTokenResponseBody {
        success: true,
        device_token_id,
        message: "device token registered".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterDeviceTokenBody {
    pub tenant_id: String,
    pub account_id: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterDeviceTokenResponseBody {
    pub success: bool,
    pub message: String,
}

pub async fn unregister_device_token(
    state: web::Data<ServerState>,
    body: web::Json<UnregisterDeviceTokenBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let existed = state
        .device_tokens
        .unregister(&body.tenant_id, &body.account_id, &body.token)
        .await
        .map_err(|e| ApiErrorKind::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(UnregisterDeviceTokenResponseBody {
        success: existed,
        message: if existed {
            "device token removed".to_string()
        } else {
            "device token not found".to_string()
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDeviceTokensQuery {
    pub tenant_id: String,
    pub account_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTokenBody {
    pub id: String,
    pub token: String,
    pub platform: Platform,
    pub device_id: Option<String>,
    pub last_used_at: Option<u64>,
    pub created_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDeviceTokensResponseBody {
    pub tokens: Vec<DeviceTokenBody>,
}

pub async fn get_device_tokens(
    state: web::Data<ServerState>,
    query: web::Query<GetDeviceTokensQuery>,
) -> ApiResult<HttpResponse> {
    let rows = state
        .device_tokens
        .list_for_account(&query.tenant_id, &query.account_id)
        .await
        .map_err(|e| ApiErrorKind::Internal(e.to_string()))?;

    let tokens = rows
        .into_iter()
        .map(|row| DeviceTokenBody {
            id: row.id,
            token: row.token,
            platform: row.platform,
            device_id: row.device_id,
            last_used_at: Some(row.last_used_at),
            created_at: row.created_at,
        })
        .collect();

    Ok(HttpResponse::Ok().json(GetDeviceTokensResponseBody { tokens }))
}
