use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::{get_authenticated_parent, require_auth};
use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::PickupAuthorization;
use crate::services::authorization_window::{parse_date, today};
use crate::services::pickup_authorizations::{
    AuthorizationDetails, CreateAuthorizationInput, UpdateAuthorizationInput,
};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// Overrides the server's local date (`YYYY-MM-DD`)
    pub today: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub student_id: String,
    pub parent_id: String,
    pub date: Option<String>,
}

/// Resolves an optional date parameter, defaulting to the local date
pub fn resolve_day(value: Option<&str>) -> Result<NaiveDate> {
    match value {
        Some(value) => parse_date(value),
        None => Ok(today()),
    }
}

/// Grants created by the caller that apply on today's weekday
async fn list_granted(
    State(state): State<AppState>,
    Query(params): Query<DayQuery>,
    session: Session,
) -> Result<Json<Vec<AuthorizationDetails>>> {
    let caller = get_authenticated_parent(&session).await?;
    let day = resolve_day(params.today.as_deref())?;

    let authorizations = state
        .authorizations
        .list_for_grantor(caller.parent_id, day)
        .await?;

    Ok(Json(authorizations))
}

/// Every grant created by the caller, with status
async fn list_all_granted(
    State(state): State<AppState>,
    Query(params): Query<DayQuery>,
    session: Session,
) -> Result<Json<Vec<AuthorizationDetails>>> {
    let caller = get_authenticated_parent(&session).await?;
    let day = resolve_day(params.today.as_deref())?;

    let authorizations = state
        .authorizations
        .list_all_for_grantor(caller.parent_id, day)
        .await?;

    Ok(Json(authorizations))
}

/// Grants naming the caller as the authorized parent
async fn list_received(
    State(state): State<AppState>,
    Query(params): Query<DayQuery>,
    session: Session,
) -> Result<Json<Vec<AuthorizationDetails>>> {
    let caller = get_authenticated_parent(&session).await?;
    let day = resolve_day(params.today.as_deref())?;

    let authorizations = state
        .authorizations
        .list_for_grantee(caller.parent_id, day)
        .await?;

    Ok(Json(authorizations))
}

async fn create_authorization(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateAuthorizationInput>,
) -> Result<(StatusCode, Json<PickupAuthorization>)> {
    let caller = get_authenticated_parent(&session).await?;

    let authorization = state
        .authorizations
        .create(caller.parent_id, req)
        .await?;

    Ok((StatusCode::CREATED, Json(authorization)))
}

async fn get_authorization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DayQuery>,
    session: Session,
) -> Result<Json<AuthorizationDetails>> {
    let caller = get_authenticated_parent(&session).await?;
    let day = resolve_day(params.today.as_deref())?;

    let authorization = state
        .authorizations
        .get(caller.parent_id, &id, day)
        .await?;

    Ok(Json(authorization))
}

async fn update_authorization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
    Json(req): Json<UpdateAuthorizationInput>,
) -> Result<Json<PickupAuthorization>> {
    let caller = get_authenticated_parent(&session).await?;

    let authorization = state
        .authorizations
        .update(caller.parent_id, &id, req)
        .await?;

    Ok(Json(authorization))
}

async fn delete_authorization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
) -> Result<StatusCode> {
    let caller = get_authenticated_parent(&session).await?;

    state.authorizations.delete(caller.parent_id, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Whether `parent_id` may collect `student_id` on `date`
async fn check_authorization(
    State(state): State<AppState>,
    Query(params): Query<CheckQuery>,
    session: Session,
) -> Result<Json<serde_json::Value>> {
    get_authenticated_parent(&session).await?;
    let day = resolve_day(params.date.as_deref())?;

    let allowed = state
        .authorizations
        .check_authorization(&params.student_id, &params.parent_id, day)
        .await?;

    Ok(Json(serde_json::json!({
        "authorized": allowed,
        "date": day,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/authorizations",
            get(list_granted).post(create_authorization),
        )
        .route("/api/authorizations/all", get(list_all_granted))
        .route("/api/authorizations/received", get(list_received))
        .route("/api/authorizations/check", get(check_authorization))
        .route(
            "/api/authorizations/:id",
            get(get_authorization)
                .put(update_authorization)
                .delete(delete_authorization),
        )
        .route_layer(middleware::from_fn(require_auth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn resolve_day_parses_override() {
        assert_eq!(
            resolve_day(Some("2024-01-15")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(matches!(
            resolve_day(Some("15/01/2024")),
            Err(AppError::Validation(_))
        ));
    }
}
