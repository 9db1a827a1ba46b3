use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    DeleteAtQuery, DeletedResponse, FavoriteResponse, GenerateResponse, PlanResponse, PlansQuery,
};
use super::repo::PlanSelector;
use crate::{
    error::{AppError, AppResult},
    extractors::SessionUser,
    readings::dto::ReadingsForm,
    state::AppState,
};

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).delete(delete_plans_at))
        .route("/plans/generate", post(generate_plan))
        .route("/plans/latest/favorite", post(favorite_latest))
        .route(
            "/plans/:id/favorite",
            post(favorite_plan).delete(unfavorite_plan),
        )
        .route("/plans/:id", delete(delete_plan))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/reset", delete(reset_all))
}

#[instrument(skip(state, form))]
pub async fn generate_plan(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Json(form): Json<ReadingsForm>,
) -> AppResult<(StatusCode, Json<GenerateResponse>)> {
    let session = state.sessions.get(&user_id);
    let outcome = state
        .orchestrator
        .generate(&session, &form.readings(), &form.dietary_preference)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(q): Query<PlansQuery>,
) -> AppResult<Json<Vec<PlanResponse>>> {
    let rows = if q.favorites {
        state.store().favorite_plans(&user_id).await?
    } else {
        state.store().all_plans(&user_id).await?
    };
    Ok(Json(rows.into_iter().map(PlanResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn favorite_latest(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> AppResult<Json<FavoriteResponse>> {
    let id = state
        .store()
        .mark_latest_favorite(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("no saved meal plans".into()))?;
    info!(%user_id, id, "latest plan marked favorite");
    Ok(Json(FavoriteResponse {
        id,
        is_favorite: true,
    }))
}

#[instrument(skip(state))]
pub async fn favorite_plan(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<i64>,
) -> AppResult<Json<FavoriteResponse>> {
    set_favorite(&state, &user_id, id, true).await
}

#[instrument(skip(state))]
pub async fn unfavorite_plan(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<i64>,
) -> AppResult<Json<FavoriteResponse>> {
    set_favorite(&state, &user_id, id, false).await
}

async fn set_favorite(
    state: &AppState,
    user_id: &str,
    id: i64,
    favorite: bool,
) -> AppResult<Json<FavoriteResponse>> {
    if !state.store().set_favorite(user_id, id, favorite).await? {
        return Err(AppError::NotFound(format!("meal plan {id}")));
    }
    Ok(Json(FavoriteResponse {
        id,
        is_favorite: favorite,
    }))
}

#[instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    match state.store().delete_plan(&user_id, PlanSelector::Id(id)).await? {
        0 => Err(AppError::NotFound(format!("meal plan {id}"))),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

#[instrument(skip(state))]
pub async fn delete_plans_at(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(q): Query<DeleteAtQuery>,
) -> AppResult<Json<DeletedResponse>> {
    let deleted = state
        .store()
        .delete_plan(&user_id, PlanSelector::At(q.at))
        .await?;
    if deleted > 1 {
        warn!(%user_id, deleted, "several plans shared the requested timestamp");
    }
    Ok(Json(DeletedResponse { deleted }))
}

#[instrument(skip(state))]
pub async fn reset_all(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.store().reset_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
