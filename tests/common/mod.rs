use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use glucoguide::app::build_app;
use glucoguide::config::{AppConfig, GeneratorConfig};
use glucoguide::db::RecordStore;
use glucoguide::plans::generator::{GenerationError, PlanGenerator};
use glucoguide::plans::prompt::GenerationRequest;
use glucoguide::readings::validator::ValidationPolicy;
use glucoguide::sensor::{SensorKind, SimulatedSensor};
use glucoguide::AppState;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Generator that replies with a fixed result and never touches the network.
pub struct StubGenerator(pub Result<String, GenerationError>);

#[async_trait]
impl PlanGenerator for StubGenerator {
    async fn generate(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
        self.0.clone()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        generator: GeneratorConfig::with_api_key("test"),
        validation_policy: ValidationPolicy::Strict,
        sensor: SensorKind::Simulated,
        default_user_id: "default".into(),
    }
}

pub async fn create_test_app(reply: Result<String, GenerationError>) -> (Router, AppState) {
    let store = RecordStore::open_in_memory()
        .await
        .expect("in-memory store");
    let state = AppState::from_parts(
        Arc::new(test_config()),
        store,
        Arc::new(StubGenerator(reply)),
        Arc::new(SimulatedSensor::default()),
    );
    (build_app(state.clone()), state)
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, user: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", user)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
