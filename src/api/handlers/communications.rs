//! Outbound communication endpoints.
//!
//! These resolve the patient, template and appointment, build the render
//! context, and hand off to the dispatcher. A transport failure still
//! answers 201: the row records the failure and the caller reads the status
//! from the body.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::appointments;
use super::patients::{self, Patient};
use super::templates::{self, Template};
use crate::api::error::ApiError;
use crate::messaging::{
    Communication, CommunicationKind, CommunicationStatus, DispatchRequest, MessagingState,
    TemplateContext,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub patient_id: Uuid,
    /// Required on the generic endpoint; ignored by /communications/sms and
    /// /communications/voice.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content: Option<String>,
    pub template_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    /// Overrides the patient's stored number when present.
    pub phone_number: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationFilter {
    pub patient_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/communications",
    params(
        ("patientId" = Option<Uuid>, Query, description = "Restrict to one patient"),
        ("type" = Option<String>, Query, description = "SMS or VOICE"),
        ("status" = Option<String>, Query, description = "Delivery status"),
    ),
    responses(
        (status = 200, description = "Most recent 100 matching communications.", body = [Communication]),
        (status = 400, description = "Unknown type or status filter."),
    ),
    tag = "communications"
)]
pub async fn list_communications(
    Query(filter): Query<CommunicationFilter>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match filter.kind.as_deref() {
        Some(kind) => Some(
            kind.parse::<CommunicationKind>()
                .map_err(|_| ApiError::Validation("type must be SMS or VOICE".to_string()))?,
        ),
        None => None,
    };
    let status = match filter.status.as_deref() {
        Some(status) => Some(
            status
                .parse::<CommunicationStatus>()
                .map_err(|_| ApiError::Validation("Unknown status filter".to_string()))?,
        ),
        None => None,
    };

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r"
        SELECT id, patient_id, type, content, phone_number, template_id,
               appointment_id, status, sent_at, delivered_at, failed_at,
               error_message, transport_message_id, created_at
        FROM communications
        WHERE 1=1
        ",
    );
    if let Some(patient_id) = filter.patient_id {
        builder.push(" AND patient_id = ").push_bind(patient_id);
    }
    if let Some(kind) = kind {
        builder.push(" AND type = ").push_bind(kind.as_str());
    }
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    builder.push(" ORDER BY created_at DESC LIMIT 100");

    let communications = builder
        .build_query_as::<Communication>()
        .fetch_all(&*pool)
        .await?;

    Ok(Json(communications))
}

#[utoipa::path(
    post,
    path = "/communications",
    request_body = SendRequest,
    responses(
        (status = 201, description = "Communication recorded; status reflects the send outcome.", body = Communication),
        (status = 400, description = "Invalid type, phone, or missing content."),
        (status = 404, description = "Patient, template or appointment not found."),
    ),
    tag = "communications"
)]
pub async fn send_communication(
    pool: Extension<PgPool>,
    messaging: Extension<Arc<MessagingState>>,
    Json(payload): Json<SendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = payload
        .kind
        .as_deref()
        .ok_or_else(|| ApiError::Validation("type is required".to_string()))?
        .parse::<CommunicationKind>()
        .map_err(|_| ApiError::Validation("type must be SMS or VOICE".to_string()))?;

    dispatch(&pool, &messaging, kind, payload).await
}

#[utoipa::path(
    post,
    path = "/communications/sms",
    request_body = SendRequest,
    responses(
        (status = 201, description = "SMS recorded; status reflects the send outcome.", body = Communication),
        (status = 400, description = "Patient has SMS disabled, or invalid input."),
        (status = 404, description = "Patient, template or appointment not found."),
    ),
    tag = "communications"
)]
pub async fn send_sms(
    pool: Extension<PgPool>,
    messaging: Extension<Arc<MessagingState>>,
    Json(payload): Json<SendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    dispatch(&pool, &messaging, CommunicationKind::Sms, payload).await
}

#[utoipa::path(
    post,
    path = "/communications/voice",
    request_body = SendRequest,
    responses(
        (status = 201, description = "Voice call recorded; status reflects the send outcome.", body = Communication),
        (status = 400, description = "Patient has voice disabled, or invalid input."),
        (status = 404, description = "Patient, template or appointment not found."),
    ),
    tag = "communications"
)]
pub async fn send_voice(
    pool: Extension<PgPool>,
    messaging: Extension<Arc<MessagingState>>,
    Json(payload): Json<SendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    dispatch(&pool, &messaging, CommunicationKind::Voice, payload).await
}

async fn dispatch(
    pool: &PgPool,
    messaging: &MessagingState,
    kind: CommunicationKind,
    payload: SendRequest,
) -> Result<(StatusCode, Json<Communication>), ApiError> {
    let patient = patients::require_patient(pool, payload.patient_id).await?;
    check_consent(&patient, kind)?;

    let template = match payload.template_id {
        Some(template_id) => Some(
            templates::fetch_template(pool, template_id)
                .await?
                .ok_or(ApiError::NotFound("Template not found"))?,
        ),
        None => None,
    };

    let content = resolve_content(&payload, template.as_ref(), kind)?;
    let context = build_context(pool, &patient, &payload, template.as_ref()).await?;

    let phone = payload
        .phone_number
        .clone()
        .unwrap_or_else(|| patient.phone_number.clone());

    let request = DispatchRequest {
        patient_id: patient.id,
        kind,
        phone,
        content,
        template_id: payload.template_id,
        appointment_id: payload.appointment_id,
        context,
    };

    let communication = messaging.dispatch(pool, request).await?;
    Ok((StatusCode::CREATED, Json(communication)))
}

/// Patients opt out per channel; a disabled channel is a hard stop.
fn check_consent(patient: &Patient, kind: CommunicationKind) -> Result<(), ApiError> {
    let allowed = match kind {
        CommunicationKind::Sms => patient.sms_enabled,
        CommunicationKind::Voice => patient.voice_enabled,
    };
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Validation(match kind {
            CommunicationKind::Sms => "Patient has SMS disabled".to_string(),
            CommunicationKind::Voice => "Patient has voice calls disabled".to_string(),
        }))
    }
}

/// Inline content wins; otherwise the template supplies it and must match
/// the channel.
fn resolve_content(
    payload: &SendRequest,
    template: Option<&Template>,
    kind: CommunicationKind,
) -> Result<String, ApiError> {
    if let Some(content) = payload.content.as_deref() {
        if !content.trim().is_empty() {
            return Ok(content.to_string());
        }
    }

    let Some(template) = template else {
        return Err(ApiError::Validation(
            "content or templateId is required".to_string(),
        ));
    };
    if template.kind != kind.as_str() {
        return Err(ApiError::Validation(format!(
            "Template type {} does not match {}",
            template.kind,
            kind.as_str()
        )));
    }
    Ok(template.content.clone())
}

async fn build_context(
    pool: &PgPool,
    patient: &Patient,
    payload: &SendRequest,
    template: Option<&Template>,
) -> Result<TemplateContext, ApiError> {
    let mut context = TemplateContext::for_patient(&patient.first_name, &patient.last_name);
    apply_variables(
        &mut context,
        template.and_then(|template| template.variables.as_ref()),
        &payload.variables,
    );

    if let Some(appointment_id) = payload.appointment_id {
        let appointment = appointments::fetch_appointment(pool, appointment_id)
            .await?
            .ok_or(ApiError::NotFound("Appointment not found"))?;
        context.appointment_title = Some(appointment.title);
        context.appointment_date = Some(format_appointment_date(&appointment.appointment_date));
        context.appointment_time = Some(format_appointment_time(&appointment.appointment_date));
    }

    Ok(context)
}

/// Template-stored variable defaults load first; request-supplied values
/// override them.
fn apply_variables(
    context: &mut TemplateContext,
    defaults: Option<&serde_json::Value>,
    overrides: &HashMap<String, String>,
) {
    if let Some(serde_json::Value::Object(map)) = defaults {
        for (key, value) in map {
            let value = match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            context.variables.insert(key.clone(), value);
        }
    }
    context
        .variables
        .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
}

fn format_appointment_date(when: &DateTime<Utc>) -> String {
    when.format("%A, %B %-d, %Y").to_string()
}

fn format_appointment_time(when: &DateTime<Utc>) -> String {
    when.format("%-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn patient(sms: bool, voice: bool) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone_number: "+15551234567".to_string(),
            email: None,
            date_of_birth: None,
            sms_enabled: sms,
            voice_enabled: voice,
            medical_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn consent_gates_each_channel() {
        let p = patient(true, false);
        assert!(check_consent(&p, CommunicationKind::Sms).is_ok());
        assert!(check_consent(&p, CommunicationKind::Voice).is_err());

        let p = patient(false, true);
        assert!(check_consent(&p, CommunicationKind::Sms).is_err());
        assert!(check_consent(&p, CommunicationKind::Voice).is_ok());
    }

    #[test]
    fn template_variable_defaults_reach_the_context() {
        let mut context = TemplateContext::for_patient("Jane", "Doe");
        let defaults = serde_json::json!({ "clinicName": "Westside Clinic", "copay": 25 });
        apply_variables(&mut context, Some(&defaults), &HashMap::new());

        assert_eq!(
            crate::messaging::template::render("Call {clinicName}, co-pay {copay}", &context),
            "Call Westside Clinic, co-pay 25"
        );
    }

    #[test]
    fn request_variables_override_template_defaults() {
        let mut context = TemplateContext::for_patient("Jane", "Doe");
        let defaults = serde_json::json!({ "clinicName": "Westside Clinic" });
        let overrides = HashMap::from([(
            "clinicName".to_string(),
            "Eastside Clinic".to_string(),
        )]);
        apply_variables(&mut context, Some(&defaults), &overrides);

        assert_eq!(
            context.variables.get("clinicName").map(String::as_str),
            Some("Eastside Clinic")
        );
    }

    #[test]
    fn missing_defaults_leave_request_variables_alone() {
        let mut context = TemplateContext::for_patient("Jane", "Doe");
        let overrides = HashMap::from([("code".to_string(), "X1".to_string())]);
        apply_variables(&mut context, None, &overrides);
        assert_eq!(context.variables.get("code").map(String::as_str), Some("X1"));
    }

    #[test]
    fn appointment_context_formats_human_dates() {
        let when = Utc.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).unwrap();
        assert_eq!(format_appointment_date(&when), "Sunday, March 9, 2025");
        assert_eq!(format_appointment_time(&when), "2:30 PM");
    }
}
