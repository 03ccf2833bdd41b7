use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;
use uuid::Uuid;

use super::session::SESSION_KEY_PARENT_ID;
use crate::error::AppError;

/// Middleware that requires a parent to be signed in
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    get_authenticated_parent(&session).await?;
    Ok(next.run(request).await)
}

/// The signed-in parent behind the current session
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedParent {
    pub parent_id: Uuid,
}

/// Extracts the authenticated parent ID from the session
pub async fn get_authenticated_parent(session: &Session) -> Result<AuthenticatedParent, AppError> {
    let parent_id: Uuid = session
        .get(SESSION_KEY_PARENT_ID)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthenticatedParent { parent_id })
}
