//! Appointment scheduling endpoints.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const APPOINTMENT_COLUMNS: &str = r"
    id, patient_id, title, description, appointment_date,
    duration_minutes, created_at, updated_at
";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub patient_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/appointments",
    params(("patientId" = Option<Uuid>, Query, description = "Restrict to one patient")),
    responses(
        (status = 200, description = "Appointments, soonest first.", body = [Appointment]),
    ),
    tag = "appointments"
)]
pub async fn list_appointments(
    Query(filter): Query<AppointmentFilter>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let appointments = match filter.patient_id {
        Some(patient_id) => {
            let query = format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                 WHERE patient_id = $1 ORDER BY appointment_date ASC"
            );
            sqlx::query_as::<_, Appointment>(&query)
                .bind(patient_id)
                .fetch_all(&*pool)
                .await?
        }
        None => {
            let query = format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY appointment_date ASC"
            );
            sqlx::query_as::<_, Appointment>(&query)
                .fetch_all(&*pool)
                .await?
        }
    };
    Ok(Json(appointments))
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = AppointmentRequest,
    responses(
        (status = 201, description = "Appointment created.", body = Appointment),
        (status = 400, description = "Missing title or unknown patient."),
    ),
    tag = "appointments"
)]
pub async fn create_appointment(
    pool: Extension<PgPool>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_appointment(&payload)?;

    let query = format!(
        r"
        INSERT INTO appointments
            (patient_id, title, description, appointment_date, duration_minutes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {APPOINTMENT_COLUMNS}
        "
    );
    let appointment = sqlx::query_as::<_, Appointment>(&query)
        .bind(payload.patient_id)
        .bind(payload.title.trim())
        .bind(payload.description.as_deref())
        .bind(payload.appointment_date)
        .bind(payload.duration_minutes.unwrap_or(30))
        .fetch_one(&*pool)
        .await
        .map_err(foreign_key_to_validation)?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    responses(
        (status = 200, description = "Appointment detail.", body = Appointment),
        (status = 404, description = "Appointment not found."),
    ),
    tag = "appointments"
)]
pub async fn get_appointment(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
    let appointment = sqlx::query_as::<_, Appointment>(&query)
        .bind(id)
        .fetch_optional(&*pool)
        .await?
        .ok_or(ApiError::NotFound("Appointment not found"))?;
    Ok(Json(appointment))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    request_body = AppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated.", body = Appointment),
        (status = 400, description = "Missing title or unknown patient."),
        (status = 404, description = "Appointment not found."),
    ),
    tag = "appointments"
)]
pub async fn update_appointment(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_appointment(&payload)?;

    let query = format!(
        r"
        UPDATE appointments
        SET patient_id = $2, title = $3, description = $4,
            appointment_date = $5, duration_minutes = $6, updated_at = NOW()
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "
    );
    let appointment = sqlx::query_as::<_, Appointment>(&query)
        .bind(id)
        .bind(payload.patient_id)
        .bind(payload.title.trim())
        .bind(payload.description.as_deref())
        .bind(payload.appointment_date)
        .bind(payload.duration_minutes.unwrap_or(30))
        .fetch_optional(&*pool)
        .await
        .map_err(foreign_key_to_validation)?
        .ok_or(ApiError::NotFound("Appointment not found"))?;

    Ok(Json(appointment))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    responses(
        (status = 204, description = "Appointment deleted."),
        (status = 404, description = "Appointment not found."),
    ),
    tag = "appointments"
)]
pub async fn delete_appointment(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Appointment not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Lookup used by the communication endpoints to stamp appointment context
/// into templates.
pub(crate) async fn fetch_appointment(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Appointment>, sqlx::Error> {
    let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
    sqlx::query_as::<_, Appointment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn validate_appointment(payload: &AppointmentRequest) -> Result<(), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    if payload.duration_minutes.is_some_and(|minutes| minutes <= 0) {
        return Err(ApiError::Validation(
            "durationMinutes must be positive".to_string(),
        ));
    }
    Ok(())
}

fn foreign_key_to_validation(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23503") {
            return ApiError::Validation("Unknown patient".to_string());
        }
    }
    ApiError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, duration: Option<i32>) -> AppointmentRequest {
        AppointmentRequest {
            patient_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            appointment_date: Utc::now(),
            duration_minutes: duration,
        }
    }

    #[test]
    fn empty_title_rejected() {
        assert!(validate_appointment(&request("  ", None)).is_err());
        assert!(validate_appointment(&request("Checkup", None)).is_ok());
    }

    #[test]
    fn non_positive_duration_rejected() {
        assert!(validate_appointment(&request("Checkup", Some(0))).is_err());
        assert!(validate_appointment(&request("Checkup", Some(-15))).is_err());
        assert!(validate_appointment(&request("Checkup", Some(45))).is_ok());
    }
}
