use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    CheckResponse, HistoryQuery, ReadingResponse, ReadingSeries, ReadingsForm,
    SensorReadingResponse,
};
use crate::{error::AppResult, extractors::SessionUser, state::AppState};

pub fn reading_routes() -> Router<AppState> {
    Router::new()
        .route("/readings", get(list_readings))
        .route("/readings/series", get(reading_series))
        .route("/readings/check", post(check_readings))
        .route("/sensor/reading", get(sensor_reading))
}

#[instrument(skip(state, form))]
pub async fn check_readings(
    State(state): State<AppState>,
    Json(form): Json<ReadingsForm>,
) -> Json<CheckResponse> {
    let out = state
        .orchestrator
        .check(&form.readings(), &form.dietary_preference);
    Json(CheckResponse {
        valid: out.errors.is_empty(),
        errors: out.errors,
        alerts: out.alerts,
    })
}

#[instrument(skip(state))]
pub async fn list_readings(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(q): Query<HistoryQuery>,
) -> AppResult<Json<Vec<ReadingResponse>>> {
    let rows = state.store().recent_readings(&user_id, q.limit).await?;
    Ok(Json(rows.into_iter().map(ReadingResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn reading_series(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(q): Query<HistoryQuery>,
) -> AppResult<Json<ReadingSeries>> {
    let rows = state.store().reading_series(&user_id, q.limit).await?;
    Ok(Json(rows.into_iter().collect()))
}

#[instrument(skip(state))]
pub async fn sensor_reading(State(state): State<AppState>) -> AppResult<Json<SensorReadingResponse>> {
    let r = state.orchestrator.prefill_from_sensor().await?;
    Ok(Json(SensorReadingResponse {
        fasting_sugar: r.fasting,
        pre_meal_sugar: r.pre_meal,
        post_meal_sugar: r.post_meal,
    }))
}
