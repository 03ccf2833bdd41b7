use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::get_authenticated_parent;
use crate::api::middleware::session::{
    AppState, SESSION_KEY_PARENT_ID, SESSION_KEY_SESSION_STARTED_AT,
};
use crate::error::{AppError, Result};
use crate::services::directory::Directory;
use crate::services::pickup_authorizations::ParentSummary;

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("Session error: {}", e))
}

#[derive(Deserialize)]
struct SessionRequest {
    access_token: String,
}

/// Exchanges an identity-provider access token for a parent session
async fn create_session(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SessionRequest>,
) -> Result<Json<ParentSummary>> {
    let auth_user_id = state.token_verifier.verify(&req.access_token)?;

    let parent = state
        .directory
        .find_parent_by_auth_user(auth_user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(auth_user_id = %auth_user_id, "No parent linked to identity");
            AppError::Unauthorized
        })?;

    // New id on privilege change
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_KEY_PARENT_ID, parent.id)
        .await
        .map_err(session_error)?;
    session
        .insert(SESSION_KEY_SESSION_STARTED_AT, Utc::now().to_rfc3339())
        .await
        .map_err(session_error)?;

    tracing::info!(parent_id = %parent.id, "Parent authenticated successfully");

    Ok(Json(ParentSummary::from(parent)))
}

/// Returns the signed-in parent
async fn current_parent(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ParentSummary>> {
    let caller = get_authenticated_parent(&session).await?;

    let parent = state
        .directory
        .find_parent(caller.parent_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(ParentSummary::from(parent)))
}

/// Logs out the parent
async fn logout(session: Session) -> Result<StatusCode> {
    session.flush().await.map_err(session_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/me", get(current_parent))
        .route("/auth/logout", post(logout))
}
