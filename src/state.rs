use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::plans::generator::{ChatCompletionsClient, PlanGenerator};
use crate::plans::prompt::ModelParams;
use crate::sensor::SensorSource;
use crate::session::{Orchestrator, Sessions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: Orchestrator,
    pub sessions: Sessions,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = RecordStore::open(&config.database_url).await?;
        let generator = Arc::new(ChatCompletionsClient::new(&config.generator)?)
            as Arc<dyn PlanGenerator>;
        let sensor: Arc<dyn SensorSource> = config.sensor.build();
        tracing::info!(sensor = ?config.sensor, "sensor source selected");

        Ok(Self::from_parts(config, store, generator, sensor))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: RecordStore,
        generator: Arc<dyn PlanGenerator>,
        sensor: Arc<dyn SensorSource>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            store,
            generator,
            sensor,
            config.validation_policy,
            ModelParams::from(&config.generator),
        );
        Self {
            config,
            orchestrator,
            sessions: Sessions::default(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        self.orchestrator.store()
    }
}
