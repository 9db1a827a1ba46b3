use serde::Serialize;

use super::dto::GlucoseReadings;
use super::validator::Field;

pub const FASTING_THRESHOLD: f64 = 126.0;
pub const PRE_MEAL_THRESHOLD: f64 = 130.0;
pub const POST_MEAL_THRESHOLD: f64 = 180.0;

/// A derived warning; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub field: Field,
    pub threshold: f64,
    pub message: String,
}

/// Thresholds are exclusive: a reading equal to its threshold does not alert.
pub fn evaluate(readings: &GlucoseReadings) -> Vec<Alert> {
    readings
        .fields()
        .into_iter()
        .filter_map(|(field, value)| {
            let threshold = threshold_for(field);
            (value > threshold).then(|| Alert {
                field,
                threshold,
                message: format!(
                    "High {field} sugar level: {value} mg/dL is above {threshold} mg/dL"
                ),
            })
        })
        .collect()
}

fn threshold_for(field: Field) -> f64 {
    match field {
        Field::Fasting => FASTING_THRESHOLD,
        Field::PreMeal => PRE_MEAL_THRESHOLD,
        Field::PostMeal => POST_MEAL_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(fasting: f64, pre_meal: f64, post_meal: f64) -> GlucoseReadings {
        GlucoseReadings {
            fasting,
            pre_meal,
            post_meal,
        }
    }

    fn fields(alerts: &[Alert]) -> Vec<Field> {
        alerts.iter().map(|a| a.field).collect()
    }

    #[test]
    fn fasting_boundary_is_exclusive() {
        assert!(evaluate(&r(126.0, 100.0, 100.0)).is_empty());
        assert_eq!(fields(&evaluate(&r(130.0, 100.0, 100.0))), vec![Field::Fasting]);
    }

    #[test]
    fn each_threshold_fires_independently() {
        assert_eq!(fields(&evaluate(&r(100.0, 131.0, 100.0))), vec![Field::PreMeal]);
        assert_eq!(fields(&evaluate(&r(100.0, 130.0, 181.0))), vec![Field::PostMeal]);
        assert!(evaluate(&r(100.0, 130.0, 180.0)).is_empty());
    }

    #[test]
    fn example_scenario_fires_all_three() {
        let alerts = evaluate(&r(140.0, 150.0, 190.0));
        assert_eq!(
            fields(&alerts),
            vec![Field::Fasting, Field::PreMeal, Field::PostMeal]
        );
        assert!(alerts[0].message.contains("fasting"));
        assert!(alerts[0].message.contains("140"));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let input = r(127.0, 131.0, 200.0);
        assert_eq!(evaluate(&input), evaluate(&input));
    }
}
