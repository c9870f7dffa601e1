//! `GetPreferences` / `UpdatePreferences` (§6).
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use actix_web::{web, HttpResponse};
use notification_common::enums::{Channel, NotificationType};
use serde::{Deserialize, Serialize};

use crate::error::{ApiErrorKind, ApiResult};
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesQuery {
    pub tenant_id: String,
    pub account_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPreferenceBody {
    pub channel: Channel,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypePreferenceBody {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub enabled_channels: Vec<Channel>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPreferencesResponseBody {
    pub channel_preferences: Vec<ChannelPreferenceBody>,
    pub type_preferences: Vec<TypePreferenceBody>,
}

pub async fn get_preferences(
    state: web::Data<ServerState>,
    query: web::Query<PreferencesQuery>,
) -> HttpResponse {
    let prefs = state
        .preferences
        .get_preferences(&query.tenant_id, &query.account_id)
        .await
        .into_inner();

    let channel_preferences = prefs
        .channels
        .iter()
        .map(|(channel, enabled)| ChannelPreferenceBody {
            channel: *channel,
            enabled: *enabled,
        })
        .collect();
    let type_preferences = prefs
        .types
        .iter()
        .map(|(notification_type, channels)| TypePreferenceBody {
            notification_type: *notification_type,
            enabled_channels: channels.iter().copied().collect(),
        })
        .collect();

    HttpResponse::Ok().json(GetPreferencesResponseBody {
        channel_preferences,
        type_preferences,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPreferenceInput {
    pub channel: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypePreferenceInput {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub enabled_channels: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesBody {
    pub tenant_id: String,
    pub account_id: String,
    #[serde(default)]
    pub channel_preferences: Vec<ChannelPreferenceInput>,
    #[serde(default)]
    pub type_preferences: Vec<TypePreferenceInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesResponseBody {
    pub success: bool,
    pub message: String,
}

pub async fn update_preferences(
    state: web::Data<ServerState>,
    body: web::Json<UpdatePreferencesBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();

    let mut channels = HashMap::new();
    for entry in body.channel_preferences {
        let channel = Channel::from_str(&entry.channel)
            .map_err(|_| ApiErrorKind::Validation(format!("unknown channel: {}", entry.channel)))?;
        channels.insert(channel, entry.enabled);
    }

    let mut types = HashMap::new();
    for entry in body.type_preferences {
        let notification_type = NotificationType::from_str(&entry.notification_type)
            .map_err(|_| ApiErrorKind::Validation(format!("unknown type: {}", entry.notification_type)))?;
        let mut enabled_channels: HashSet<Channel> = HashSet::new();
        for raw in entry.enabled_channels {
            enabled_channels.insert(
                Channel::from_str(&raw).map_err(|_| ApiErrorKind::Validation(format!("unknown channel: {raw}")))?,
            );
        }
        types.insert(notification_type, enabled_channels);
    }

    state
        .preferences
        .update_preferences(&body.tenant_id, &body.account_id, channels, types)
        .await
        .map_err(|e| ApiErrorKind::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(UpdatePreferencesResponseBody {
        success: true,
        message: "preferences updated".to_string(),
    }))
}
