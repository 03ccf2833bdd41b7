use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::api::middleware::session::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gate_function: bool,
    pub lookup_cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Returns 200 once the database answers and the pickup gate function is
/// installed, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (gate_function, error) = match gate_function_installed(&state.pool).await {
        Ok(installed) => (installed, None),
        Err(e) => (false, Some(format!("Database error: {}", e))),
    };

    let status_code = if gate_function {
        StatusCode::OK
    } else {
        tracing::warn!(?error, "Health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if gate_function { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        gate_function,
        lookup_cache_entries: state.directory.cached_entries(),
        error,
    };

    (status_code, Json(response))
}

/// Whether the migrations installed the pickup gate function
pub async fn gate_function_installed(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT to_regprocedure('check_pickup_authorization_with_days(uuid, uuid, date)') IS NOT NULL
        "#,
    )
    .fetch_one(pool)
    .await
}
