use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::MealPlanRecord;
use crate::readings::alerts::Alert;
use crate::readings::dto::ReadingResponse;
use crate::session::GenerationOutcome;

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: i64,
    pub plan_text: String,
    pub preference: Option<String>,
    pub is_favorite: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<MealPlanRecord> for PlanResponse {
    fn from(p: MealPlanRecord) -> Self {
        Self {
            id: p.id,
            plan_text: p.plan_text,
            preference: p.preference,
            is_favorite: p.is_favorite,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub reading: ReadingResponse,
    pub plan: PlanResponse,
    pub alerts: Vec<Alert>,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(o: GenerationOutcome) -> Self {
        Self {
            reading: o.reading.into(),
            plan: o.plan.into(),
            alerts: o.alerts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub id: i64,
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlansQuery {
    #[serde(default)]
    pub favorites: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAtQuery {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}
