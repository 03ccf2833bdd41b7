use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::authorizations::{resolve_day, DayQuery};
use crate::api::middleware::auth::{get_authenticated_parent, require_auth};
use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::SelfCheckoutAuthorization;
use crate::services::self_checkout::{CreateSelfCheckoutInput, SelfCheckoutDetails};

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelfCheckoutQuery {
    pub student_id: String,
    pub date: Option<String>,
}

async fn list_self_checkouts(
    State(state): State<AppState>,
    Query(params): Query<DayQuery>,
    session: Session,
) -> Result<Json<Vec<SelfCheckoutDetails>>> {
    let caller = get_authenticated_parent(&session).await?;
    let day = resolve_day(params.today.as_deref())?;

    let authorizations = state
        .self_checkouts
        .list_for_parent(caller.parent_id, day)
        .await?;

    Ok(Json(authorizations))
}

async fn create_self_checkout(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateSelfCheckoutInput>,
) -> Result<(StatusCode, Json<SelfCheckoutAuthorization>)> {
    let caller = get_authenticated_parent(&session).await?;

    let authorization = state.self_checkouts.create(caller.parent_id, req).await?;

    Ok((StatusCode::CREATED, Json(authorization)))
}

async fn set_self_checkout_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<SelfCheckoutAuthorization>> {
    let caller = get_authenticated_parent(&session).await?;

    let authorization = state
        .self_checkouts
        .set_active(caller.parent_id, &id, req.is_active)
        .await?;

    Ok(Json(authorization))
}

async fn delete_self_checkout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
) -> Result<StatusCode> {
    let caller = get_authenticated_parent(&session).await?;

    state.self_checkouts.delete(caller.parent_id, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn check_self_checkout(
    State(state): State<AppState>,
    Query(params): Query<SelfCheckoutQuery>,
    session: Session,
) -> Result<Json<serde_json::Value>> {
    get_authenticated_parent(&session).await?;
    let day = resolve_day(params.date.as_deref())?;

    let allowed = state
        .self_checkouts
        .is_allowed(&params.student_id, day)
        .await?;

    Ok(Json(serde_json::json!({
        "allowed": allowed,
        "date": day,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/self-checkout",
            get(list_self_checkouts).post(create_self_checkout),
        )
        .route("/api/self-checkout/check", get(check_self_checkout))
        .route("/api/self-checkout/:id", delete(delete_self_checkout))
        .route("/api/self-checkout/:id/active", put(set_self_checkout_active))
        .route_layer(middleware::from_fn(require_auth))
}
