pub mod dto;
pub mod generator;
pub mod handlers;
pub mod prompt;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::plan_routes())
        .merge(handlers::admin_routes())
}
