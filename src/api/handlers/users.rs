//! Staff account administration. Every endpoint here is admin-only.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{is_unique_violation, ApiError};
use crate::api::handlers::auth::{
    password,
    principal::ensure_admin,
    storage::{User, ROLE_ADMIN, ROLE_USER, USER_COLUMNS},
    Principal,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All staff accounts.", body = [User]),
        (status = 403, description = "Caller is not an admin."),
    ),
    tag = "users"
)]
pub async fn list_users(
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&principal)?;
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let users = sqlx::query_as::<_, User>(&query).fetch_all(&*pool).await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created.", body = User),
        (status = 400, description = "Invalid username, password or role."),
        (status = 403, description = "Caller is not an admin."),
        (status = 409, description = "Username already taken."),
    ),
    tag = "users"
)]
pub async fn create_user(
    Extension(principal): Extension<Principal>,
    pool: Extension<PgPool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&principal)?;

    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }
    let role = validate_role(payload.role.as_deref())?;

    let hash = password::hash_password(&payload.password)
        .map_err(|_| ApiError::Validation("Failed to hash password".to_string()))?;

    let query = format!(
        r"
        INSERT INTO users (username, password_hash, role)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
        "
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(username)
        .bind(&hash)
        .bind(role)
        .fetch_one(&*pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ApiError::Conflict("Username already taken")
            } else {
                ApiError::Database(err)
            }
        })?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    responses(
        (status = 200, description = "Account detail.", body = User),
        (status = 403, description = "Caller is not an admin."),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
pub async fn get_user(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&principal)?;
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let user = sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(&*pool)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated.", body = User),
        (status = 400, description = "Invalid role or empty update."),
        (status = 403, description = "Caller is not an admin."),
        (status = 404, description = "User not found."),
        (status = 409, description = "Username already taken."),
    ),
    tag = "users"
)]
pub async fn update_user(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&principal)?;

    if payload.username.is_none() && payload.password.is_none() && payload.role.is_none() {
        return Err(ApiError::Validation("Nothing to update".to_string()));
    }

    let role = match payload.role.as_deref() {
        Some(role) => Some(validate_role(Some(role))?),
        None => None,
    };

    let hash = match payload.password.as_deref() {
        Some(password) if !password.is_empty() => Some(
            password::hash_password(password)
                .map_err(|_| ApiError::Validation("Failed to hash password".to_string()))?,
        ),
        Some(_) => {
            return Err(ApiError::Validation("Password must not be empty".to_string()));
        }
        None => None,
    };

    let query = format!(
        r"
        UPDATE users
        SET username = COALESCE($2, username),
            password_hash = COALESCE($3, password_hash),
            role = COALESCE($4, role),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "
    );
    let user = sqlx::query_as::<_, User>(&query)
        .bind(id)
        .bind(payload.username.as_deref().map(str::trim))
        .bind(hash.as_deref())
        .bind(role)
        .fetch_optional(&*pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ApiError::Conflict("Username already taken")
            } else {
                ApiError::Database(err)
            }
        })?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    responses(
        (status = 204, description = "Account deleted."),
        (status = 403, description = "Caller is not an admin, or target is an admin."),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
pub async fn delete_user(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_admin(&principal)?;

    let target: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await?;
    let Some(role) = target else {
        return Err(ApiError::NotFound("User not found"));
    };

    // Admin accounts cannot be deleted, not even by another admin.
    if role == ROLE_ADMIN {
        return Err(ApiError::Forbidden("Admin accounts cannot be deleted"));
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&*pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn validate_role(role: Option<&str>) -> Result<&str, ApiError> {
    match role {
        None => Ok(ROLE_USER),
        Some(role) if role == ROLE_ADMIN || role == ROLE_USER => Ok(role),
        Some(_) => Err(ApiError::Validation(
            "role must be admin or user".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user() {
        assert_eq!(validate_role(None).unwrap(), ROLE_USER);
    }

    #[test]
    fn known_roles_pass() {
        assert_eq!(validate_role(Some("admin")).unwrap(), "admin");
        assert_eq!(validate_role(Some("user")).unwrap(), "user");
    }

    #[test]
    fn unknown_role_rejected() {
        assert!(validate_role(Some("superuser")).is_err());
        assert!(validate_role(Some("")).is_err());
    }
}
