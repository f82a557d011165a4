//! Aggregate counters for the portal dashboard.

use axum::{extract::Extension, response::IntoResponse, Json};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::api::error::ApiError;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_patients: i64,
    pub total_appointments: i64,
    pub upcoming_appointments: i64,
    pub total_communications: i64,
    /// Communication counts keyed by delivery status.
    pub communications_by_status: HashMap<String, i64>,
    /// Communication counts keyed by channel (SMS, VOICE).
    pub communications_by_type: HashMap<String, i64>,
}

#[utoipa::path(
    get,
    path = "/analytics/summary",
    responses(
        (status = 200, description = "Dashboard counters.", body = AnalyticsSummary),
        (status = 401, description = "Missing or invalid credential."),
    ),
    tag = "analytics"
)]
pub async fn summary(pool: Extension<PgPool>) -> Result<impl IntoResponse, ApiError> {
    let total_patients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
        .fetch_one(&*pool)
        .await?;
    let total_appointments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
        .fetch_one(&*pool)
        .await?;
    let upcoming_appointments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE appointment_date > NOW()")
            .fetch_one(&*pool)
            .await?;

    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM communications GROUP BY status")
            .fetch_all(&*pool)
            .await?;
    let by_type: Vec<(String, i64)> =
        sqlx::query_as("SELECT type, COUNT(*) FROM communications GROUP BY type")
            .fetch_all(&*pool)
            .await?;

    let total_communications = by_status.iter().map(|(_, count)| count).sum();

    Ok(Json(AnalyticsSummary {
        total_patients,
        total_appointments,
        upcoming_appointments,
        total_communications,
        communications_by_status: by_status.into_iter().collect(),
        communications_by_type: by_type.into_iter().collect(),
    }))
}
