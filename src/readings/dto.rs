use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::alerts::Alert;
use super::repo::ReadingSnapshot;
use super::validator::{Field, ValidationError};

/// The three readings of one snapshot, in mg/dL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReadings {
    pub fasting: f64,
    pub pre_meal: f64,
    pub post_meal: f64,
}

impl GlucoseReadings {
    pub fn fields(&self) -> [(Field, f64); 3] {
        [
            (Field::Fasting, self.fasting),
            (Field::PreMeal, self.pre_meal),
            (Field::PostMeal, self.post_meal),
        ]
    }
}

/// Form input shared by the check and generate endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingsForm {
    pub fasting_sugar: f64,
    pub pre_meal_sugar: f64,
    pub post_meal_sugar: f64,
    pub dietary_preference: String,
}

impl ReadingsForm {
    pub fn readings(&self) -> GlucoseReadings {
        GlucoseReadings {
            fasting: self.fasting_sugar,
            pre_meal: self.pre_meal_sugar,
            post_meal: self.post_meal_sugar,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct ReadingResponse {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub fasting_sugar: f64,
    pub pre_meal_sugar: f64,
    pub post_meal_sugar: f64,
}

impl From<ReadingSnapshot> for ReadingResponse {
    fn from(r: ReadingSnapshot) -> Self {
        Self {
            id: r.id,
            recorded_at: r.created_at,
            fasting_sugar: r.fasting_sugar,
            pre_meal_sugar: r.pre_meal_sugar,
            post_meal_sugar: r.post_meal_sugar,
        }
    }
}

/// Column-oriented history for the line chart, oldest first.
#[derive(Debug, Default, Serialize)]
pub struct ReadingSeries {
    #[serde(with = "rfc3339_vec")]
    pub timestamps: Vec<OffsetDateTime>,
    pub fasting_sugar: Vec<f64>,
    pub pre_meal_sugar: Vec<f64>,
    pub post_meal_sugar: Vec<f64>,
}

impl FromIterator<ReadingSnapshot> for ReadingSeries {
    fn from_iter<I: IntoIterator<Item = ReadingSnapshot>>(iter: I) -> Self {
        let mut series = Self::default();
        for r in iter {
            series.timestamps.push(r.created_at);
            series.fasting_sugar.push(r.fasting_sugar);
            series.pre_meal_sugar.push(r.pre_meal_sugar);
            series.post_meal_sugar.push(r.post_meal_sugar);
        }
        series
    }
}

#[derive(Debug, Serialize)]
pub struct SensorReadingResponse {
    pub fasting_sugar: f64,
    pub pre_meal_sugar: f64,
    pub post_meal_sugar: f64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    7
}

mod rfc3339_vec {
    use serde::ser::SerializeSeq;
    use serde::Serializer;
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(v: &[OffsetDateTime], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(v.len()))?;
        for ts in v {
            let text = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
            seq.serialize_element(&text)?;
        }
        seq.end()
    }
}
