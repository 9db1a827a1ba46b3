//! Per-user session state and the generate pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::OffsetDateTime;

use crate::db::RecordStore;
use crate::error::{AppError, AppResult};
use crate::plans::generator::PlanGenerator;
use crate::plans::prompt::{self, ModelParams};
use crate::plans::repo::{MealPlanRecord, NewPlan};
use crate::readings::alerts::{self, Alert};
use crate::readings::dto::GlucoseReadings;
use crate::readings::repo::ReadingSnapshot;
use crate::readings::validator::{self, ValidationError, ValidationPolicy};
use crate::sensor::SensorSource;

/// State for one user's session, passed explicitly into every orchestrator
/// call.
#[derive(Debug)]
pub struct SessionContext {
    user_id: String,
    in_flight: AtomicBool,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claims the session for one generation; `None` if already claimed.
    fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }
}

/// Releases the session when dropped, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Hands out one [`SessionContext`] per user id.
///
/// Only contexts someone still holds are kept: idle entries are dropped
/// whenever a new user id is registered, so arbitrary `x-user-id` values
/// cannot grow the map.
#[derive(Debug, Default, Clone)]
pub struct Sessions {
    inner: Arc<Mutex<HashMap<String, Arc<SessionContext>>>>,
}

impl Sessions {
    pub fn get(&self, user_id: &str) -> Arc<SessionContext> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ctx) = map.get(user_id) {
            return ctx.clone();
        }
        map.retain(|_, ctx| Arc::strong_count(ctx) > 1 || ctx.is_busy());
        let ctx = Arc::new(SessionContext::new(user_id));
        map.insert(user_id.to_string(), ctx.clone());
        ctx
    }

    /// Number of contexts currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a validation preview.
#[derive(Debug, Serialize)]
pub struct CheckOutcome {
    pub errors: Vec<ValidationError>,
    pub alerts: Vec<Alert>,
}

/// Result of a successful generate action.
#[derive(Debug, Serialize)]
pub struct GenerationOutcome {
    pub reading: ReadingSnapshot,
    pub plan: MealPlanRecord,
    pub alerts: Vec<Alert>,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: RecordStore,
    generator: Arc<dyn PlanGenerator>,
    sensor: Arc<dyn SensorSource>,
    policy: ValidationPolicy,
    params: ModelParams,
}

impl Orchestrator {
    pub fn new(
        store: RecordStore,
        generator: Arc<dyn PlanGenerator>,
        sensor: Arc<dyn SensorSource>,
        policy: ValidationPolicy,
        params: ModelParams,
    ) -> Self {
        Self {
            store,
            generator,
            sensor,
            policy,
            params,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validation and alerts only; nothing is written.
    pub fn check(&self, readings: &GlucoseReadings, preference: &str) -> CheckOutcome {
        let errors = validator::validate(self.policy, readings, preference);
        let alerts = if errors.is_empty() {
            alerts::evaluate(readings)
        } else {
            Vec::new()
        };
        CheckOutcome { errors, alerts }
    }

    pub async fn prefill_from_sensor(&self) -> AppResult<GlucoseReadings> {
        Ok(self.sensor.read().await?)
    }

    /// validate → alerts → prompt → generate → persist.
    ///
    /// Writes happen only after the generator succeeded, and the snapshot
    /// and plan are stored together.
    #[tracing::instrument(skip_all, fields(user_id = %session.user_id()))]
    pub async fn generate(
        &self,
        session: &SessionContext,
        readings: &GlucoseReadings,
        preference: &str,
    ) -> AppResult<GenerationOutcome> {
        let _guard = session.try_begin().ok_or(AppError::Busy)?;

        let errors = validator::validate(self.policy, readings, preference);
        if !errors.is_empty() {
            tracing::info!(count = errors.len(), "validation failed");
            return Err(AppError::Validation(errors));
        }

        let alerts = alerts::evaluate(readings);
        let request = prompt::build(readings, preference, &self.params);
        let plan_text = self.generator.generate(&request).await?;

        let preference = preference.trim();
        let (reading, plan) = self
            .store
            .save_generation(
                session.user_id(),
                readings,
                &NewPlan {
                    plan_text: &plan_text,
                    preference: Some(preference),
                    is_favorite: false,
                },
                OffsetDateTime::now_utc(),
            )
            .await?;

        tracing::info!(alerts = alerts.len(), plan_id = plan.id, "meal plan generated");
        Ok(GenerationOutcome {
            reading,
            plan,
            alerts,
        })
    }
}
