//! Message template management.
//!
//! Templates hold `{placeholder}` text rendered at dispatch time. The
//! `variables` column records custom placeholder defaults as JSON.

use axum::{
    extract::{Extension, Path},
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
use crate::messaging::CommunicationKind;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub variables: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TEMPLATE_COLUMNS: &str = r#"id, name, type, content, variables, created_at, updated_at"#;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TemplateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub variables: Option<serde_json::Value>,
}

#[utoipa::path(
    get,
    path = "/templates",
    responses(
        (status = 200, description = "All templates, newest first.", body = [Template]),
    ),
    tag = "templates"
)]
pub async fn list_templates(pool: Extension<PgPool>) -> Result<impl IntoResponse, ApiError> {
    let query = format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY created_at DESC");
    let templates = sqlx::query_as::<_, Template>(&query)
        .fetch_all(&*pool)
        .await?;
    Ok(Json(templates))
}

#[utoipa::path(
    post,
    path = "/templates",
    request_body = TemplateRequest,
    responses(
        (status = 201, description = "Template created.", body = Template),
        (status = 400, description = "Missing fields or unknown type."),
    ),
    tag = "templates"
)]
pub async fn create_template(
    pool: Extension<PgPool>,
    Json(payload): Json<TemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = validate_template(&payload)?;

    let query = format!(
        r"
        INSERT INTO templates (name, type, content, variables)
        VALUES ($1, $2, $3, $4)
        RETURNING {TEMPLATE_COLUMNS}
        "
    );
    let template = sqlx::query_as::<_, Template>(&query)
        .bind(payload.name.trim())
        .bind(kind.as_str())
        .bind(&payload.content)
        .bind(payload.variables.as_ref())
        .fetch_one(&*pool)
        .await?;

    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/templates/{id}",
    responses(
        (status = 200, description = "Template detail.", body = Template),
        (status = 404, description = "Template not found."),
    ),
    tag = "templates"
)]
pub async fn get_template(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let template = fetch_template(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("Template not found"))?;
    Ok(Json(template))
}

#[utoipa::path(
    put,
    path = "/templates/{id}",
    request_body = TemplateRequest,
    responses(
        (status = 200, description = "Template updated.", body = Template),
        (status = 400, description = "Missing fields or unknown type."),
        (status = 404, description = "Template not found."),
    ),
    tag = "templates"
)]
pub async fn update_template(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    Json(payload): Json<TemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = validate_template(&payload)?;

    let query = format!(
        r"
        UPDATE templates
        SET name = $2, type = $3, content = $4, variables = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING {TEMPLATE_COLUMNS}
        "
    );
    let template = sqlx::query_as::<_, Template>(&query)
        .bind(id)
        .bind(payload.name.trim())
        .bind(kind.as_str())
        .bind(&payload.content)
        .bind(payload.variables.as_ref())
        .fetch_optional(&*pool)
        .await?
        .ok_or(ApiError::NotFound("Template not found"))?;

    Ok(Json(template))
}

#[utoipa::path(
    delete,
    path = "/templates/{id}",
    responses(
        (status = 204, description = "Template deleted."),
        (status = 404, description = "Template not found."),
    ),
    tag = "templates"
)]
pub async fn delete_template(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Template not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_template(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Template>, sqlx::Error> {
    let query = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = $1");
    sqlx::query_as::<_, Template>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn validate_template(payload: &TemplateRequest) -> Result<CommunicationKind, ApiError> {
    if payload.name.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "name and content are required".to_string(),
        ));
    }
    payload
        .kind
        .parse::<CommunicationKind>()
        .map_err(|_| ApiError::Validation("type must be SMS or VOICE".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, kind: &str, content: &str) -> TemplateRequest {
        TemplateRequest {
            name: name.to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
            variables: None,
        }
    }

    #[test]
    fn known_kinds_pass() {
        assert!(validate_template(&request("Reminder", "SMS", "Hi {firstName}")).is_ok());
        assert!(validate_template(&request("Reminder", "VOICE", "Hi {firstName}")).is_ok());
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(validate_template(&request("Reminder", "EMAIL", "Hi")).is_err());
    }

    #[test]
    fn empty_name_or_content_rejected() {
        assert!(validate_template(&request("", "SMS", "Hi")).is_err());
        assert!(validate_template(&request("Reminder", "SMS", "  ")).is_err());
    }
}
