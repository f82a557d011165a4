//! User lookups shared by login, credential resolution, and user management.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Sanitized user record: never carries the password hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub const USER_COLUMNS: &str = "id, username, role, created_at, updated_at";

/// Load a sanitized user by id.
///
/// # Errors
/// Returns database errors; a missing user is `Ok(None)`.
pub async fn fetch_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Load a user and its stored password hash by username, for login only.
///
/// # Errors
/// Returns database errors; a missing user is `Ok(None)`.
pub async fn fetch_user_for_login(
    pool: &PgPool,
    username: &str,
) -> Result<Option<(User, String)>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct LoginRow {
        id: Uuid,
        username: String,
        password_hash: String,
        role: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    let row = sqlx::query_as::<_, LoginRow>(
        "SELECT id, username, password_hash, role, created_at, updated_at
         FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        (
            User {
                id: row.id,
                username: row.username,
                role: row.role,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            row.password_hash,
        )
    }))
}
