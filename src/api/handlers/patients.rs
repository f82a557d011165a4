//! Patient record management.
//!
//! Patients own communications and appointments. Phone numbers are unique;
//! duplicate creates surface as 409. Bulk import accepts the portal's CSV
//! format (`firstName,lastName,phoneNumber,email,smsEnabled,voiceEnabled,
//! medicalNotes`) with `true`/`1` booleans.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{is_unique_violation, ApiError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sms_enabled: bool,
    pub voice_enabled: bool,
    pub medical_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PATIENT_COLUMNS: &str = r"
    id, first_name, last_name, phone_number, email, date_of_birth,
    sms_enabled, voice_enabled, medical_notes, created_at, updated_at
";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sms_enabled: Option<bool>,
    pub voice_enabled: Option<bool>,
    pub medical_notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: Vec<ImportFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub line: usize,
    pub error: String,
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All patients, newest first.", body = [Patient]),
        (status = 401, description = "Missing or invalid credential."),
    ),
    tag = "patients"
)]
pub async fn list_patients(pool: Extension<PgPool>) -> Result<impl IntoResponse, ApiError> {
    let query = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC");
    let patients = sqlx::query_as::<_, Patient>(&query).fetch_all(&*pool).await?;
    Ok(Json(patients))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientRequest,
    responses(
        (status = 201, description = "Patient created.", body = Patient),
        (status = 400, description = "Missing required fields."),
        (status = 409, description = "Phone number already registered."),
    ),
    tag = "patients"
)]
pub async fn create_patient(
    pool: Extension<PgPool>,
    Json(payload): Json<PatientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_patient(&payload)?;

    let query = format!(
        r"
        INSERT INTO patients
            (first_name, last_name, phone_number, email, date_of_birth,
             sms_enabled, voice_enabled, medical_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {PATIENT_COLUMNS}
        "
    );
    let patient = sqlx::query_as::<_, Patient>(&query)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(payload.phone_number.trim())
        .bind(payload.email.as_deref().map(str::trim))
        .bind(payload.date_of_birth)
        .bind(payload.sms_enabled.unwrap_or(true))
        .bind(payload.voice_enabled.unwrap_or(true))
        .bind(payload.medical_notes.as_deref())
        .fetch_one(&*pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ApiError::Conflict("Phone number already registered")
            } else {
                ApiError::Database(err)
            }
        })?;

    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient detail.", body = Patient),
        (status = 404, description = "Patient not found."),
    ),
    tag = "patients"
)]
pub async fn get_patient(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = fetch_patient(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("Patient not found"))?;
    Ok(Json(patient))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body = PatientRequest,
    responses(
        (status = 200, description = "Patient updated.", body = Patient),
        (status = 400, description = "Missing required fields."),
        (status = 404, description = "Patient not found."),
        (status = 409, description = "Phone number already registered."),
    ),
    tag = "patients"
)]
pub async fn update_patient(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    Json(payload): Json<PatientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_patient(&payload)?;

    let query = format!(
        r"
        UPDATE patients
        SET first_name = $2, last_name = $3, phone_number = $4, email = $5,
            date_of_birth = $6, sms_enabled = $7, voice_enabled = $8,
            medical_notes = $9, updated_at = NOW()
        WHERE id = $1
        RETURNING {PATIENT_COLUMNS}
        "
    );
    let patient = sqlx::query_as::<_, Patient>(&query)
        .bind(id)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(payload.phone_number.trim())
        .bind(payload.email.as_deref().map(str::trim))
        .bind(payload.date_of_birth)
        .bind(payload.sms_enabled.unwrap_or(true))
        .bind(payload.voice_enabled.unwrap_or(true))
        .bind(payload.medical_notes.as_deref())
        .fetch_optional(&*pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ApiError::Conflict("Phone number already registered")
            } else {
                ApiError::Database(err)
            }
        })?
        .ok_or(ApiError::NotFound("Patient not found"))?;

    Ok(Json(patient))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    responses(
        (status = 204, description = "Patient deleted."),
        (status = 404, description = "Patient not found."),
    ),
    tag = "patients"
)]
pub async fn delete_patient(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Patient not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Headers in the import format are camelCase, matching the JSON wire names.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvPatientRow {
    first_name: String,
    last_name: String,
    phone_number: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    sms_enabled: Option<String>,
    #[serde(default)]
    voice_enabled: Option<String>,
    #[serde(default)]
    medical_notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/patients/import",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import summary with per-line failures.", body = ImportSummary),
    ),
    tag = "patients"
)]
pub async fn import_patients(
    pool: Extension<PgPool>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut imported = 0;
    let mut failed = Vec::new();

    // Header is line 1; data starts at line 2.
    for (index, record) in reader.deserialize::<CsvPatientRow>().enumerate() {
        let line = index + 2;
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                failed.push(ImportFailure {
                    line,
                    error: err.to_string(),
                });
                continue;
            }
        };

        if row.first_name.is_empty() || row.last_name.is_empty() || row.phone_number.is_empty() {
            failed.push(ImportFailure {
                line,
                error: "firstName, lastName and phoneNumber are required".to_string(),
            });
            continue;
        }

        let result = sqlx::query(
            r"
            INSERT INTO patients
                (first_name, last_name, phone_number, email,
                 sms_enabled, voice_enabled, medical_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.phone_number)
        .bind(row.email.as_deref().filter(|email| !email.is_empty()))
        .bind(parse_csv_bool(row.sms_enabled.as_deref()))
        .bind(parse_csv_bool(row.voice_enabled.as_deref()))
        .bind(row.medical_notes.as_deref().filter(|notes| !notes.is_empty()))
        .execute(&*pool)
        .await;

        match result {
            Ok(_) => imported += 1,
            Err(err) if is_unique_violation(&err) => failed.push(ImportFailure {
                line,
                error: "Phone number already registered".to_string(),
            }),
            Err(err) => return Err(ApiError::Database(err)),
        }
    }

    Ok(Json(ImportSummary { imported, failed }))
}

/// Booleans in the import format accept `true`/`1`; anything else is false.
fn parse_csv_bool(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        let value = value.trim();
        value.eq_ignore_ascii_case("true") || value == "1"
    })
}

fn validate_patient(payload: &PatientRequest) -> Result<(), ApiError> {
    if payload.first_name.trim().is_empty()
        || payload.last_name.trim().is_empty()
        || payload.phone_number.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "firstName, lastName and phoneNumber are required".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_patient(pool: &PgPool, id: Uuid) -> Result<Option<Patient>, sqlx::Error> {
    let query = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
    sqlx::query_as::<_, Patient>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Shared lookup used by the communication endpoints.
pub(crate) async fn require_patient(pool: &PgPool, id: Uuid) -> Result<Patient, ApiError> {
    fetch_patient(pool, id)
        .await?
        .ok_or(ApiError::NotFound("Patient not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_booleans_accept_true_and_one() {
        assert!(parse_csv_bool(Some("true")));
        assert!(parse_csv_bool(Some("TRUE")));
        assert!(parse_csv_bool(Some("1")));
        assert!(!parse_csv_bool(Some("0")));
        assert!(!parse_csv_bool(Some("false")));
        assert!(!parse_csv_bool(Some("yes")));
        assert!(!parse_csv_bool(None));
    }

    #[test]
    fn csv_rows_deserialize_with_camel_case_headers() {
        let data = "firstName,lastName,phoneNumber,email,smsEnabled,voiceEnabled,medicalNotes\n\
                    Jane,Doe,+15551234567,jane@example.com,true,1,allergic to penicillin\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        let rows: Vec<CsvPatientRow> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].first_name, "Jane");
        assert_eq!(rows[0].phone_number, "+15551234567");
        assert_eq!(rows[0].sms_enabled.as_deref(), Some("true"));
    }

    #[test]
    fn missing_required_fields_rejected() {
        let payload = PatientRequest {
            first_name: " ".to_string(),
            last_name: "Doe".to_string(),
            phone_number: "+15551234567".to_string(),
            email: None,
            date_of_birth: None,
            sms_enabled: None,
            voice_enabled: None,
            medical_notes: None,
        };
        assert!(validate_patient(&payload).is_err());
    }
}
