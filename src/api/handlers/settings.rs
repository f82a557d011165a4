//! Messaging mode toggle.
//!
//! Reads are public so the portal can show a demo banner before login.
//! Writes are admin-only and take effect for the next dispatch.

use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::handlers::auth::{principal::ensure_admin, Principal};
use crate::messaging::{MessagingMode, MessagingState};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub messaging_mode: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub messaging_mode: String,
}

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Current messaging mode.", body = SettingsResponse),
    ),
    tag = "settings"
)]
pub async fn get_settings(messaging: Extension<Arc<MessagingState>>) -> impl IntoResponse {
    Json(SettingsResponse {
        messaging_mode: messaging.mode().await.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/settings",
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "Mode updated.", body = SettingsResponse),
        (status = 400, description = "Mode is not demo or live."),
        (status = 403, description = "Caller is not an admin."),
    ),
    tag = "settings"
)]
pub async fn update_settings(
    Extension(principal): Extension<Principal>,
    messaging: Extension<Arc<MessagingState>>,
    Json(payload): Json<SettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&principal)?;

    let mode = payload
        .messaging_mode
        .parse::<MessagingMode>()
        .map_err(|_| ApiError::Validation("messagingMode must be demo or live".to_string()))?;

    messaging.set_mode(mode).await;

    Ok(Json(SettingsResponse {
        messaging_mode: mode.to_string(),
    }))
}
