pub mod alerts;
pub mod dto;
pub mod handlers;
pub mod repo;
pub mod validator;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::reading_routes()
}
