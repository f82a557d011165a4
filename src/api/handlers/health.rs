use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde_json::json;

use crate::api::GIT_COMMIT_HASH;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up."),
    ),
    tag = "system"
)]
pub async fn health() -> impl IntoResponse {
    let body = Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "message": "Careline API is running",
    }));

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}
