//! Range checks for raw glucose readings and the dietary preference.
//!
//! `validate` never short-circuits: every violated rule is reported so the
//! caller can show all of them at once.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dto::GlucoseReadings;

/// Upper bound shared by both policies, in mg/dL.
pub const MAX_READING: f64 = 500.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Clinical band: fasting in [50, 500], pre/post meal in [70, 500].
    #[default]
    Strict,
    /// Any non-negative reading up to 500.
    Minimum,
}

impl ValidationPolicy {
    pub fn bounds(self, field: Field) -> (f64, f64) {
        match (self, field) {
            (ValidationPolicy::Minimum, _) => (0.0, MAX_READING),
            (ValidationPolicy::Strict, Field::Fasting) => (50.0, MAX_READING),
            (ValidationPolicy::Strict, Field::PreMeal | Field::PostMeal) => (70.0, MAX_READING),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown validation policy `{0}` (expected `strict` or `minimum`)")]
pub struct ParsePolicyError(String);

impl FromStr for ValidationPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "minimum" | "min" => Ok(Self::Minimum),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Fasting,
    PreMeal,
    PostMeal,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Fasting => "fasting",
            Field::PreMeal => "pre-meal",
            Field::PostMeal => "post-meal",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{field} sugar level {value} mg/dL is outside [{min}, {max}]")]
    OutOfRange {
        field: Field,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} sugar level is not a number")]
    NotANumber { field: Field },
    #[error("dietary preference must not be empty")]
    EmptyPreference,
}

pub fn validate(
    policy: ValidationPolicy,
    readings: &GlucoseReadings,
    preference: &str,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (field, value) in readings.fields() {
        if !value.is_finite() {
            errors.push(ValidationError::NotANumber { field });
            continue;
        }
        let (min, max) = policy.bounds(field);
        if value < min || value > max {
            errors.push(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
    }

    if preference.trim().is_empty() {
        errors.push(ValidationError::EmptyPreference);
    }

    errors
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

    #[test]
    fn accepts_example_scenario_under_strict_policy() {
        let errs = validate(ValidationPolicy::Strict, &r(140.0, 150.0, 190.0), "vegetarian");
        assert!(errs.is_empty(), "{errs:?}");
    }

    #[test]
    fn strict_bounds_are_inclusive() {
        assert!(validate(ValidationPolicy::Strict, &r(50.0, 70.0, 500.0), "x").is_empty());
        let errs = validate(ValidationPolicy::Strict, &r(49.9, 69.0, 500.1), "x");
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn negative_readings_rejected_by_every_policy() {
        for policy in [ValidationPolicy::Strict, ValidationPolicy::Minimum] {
            let errs = validate(policy, &r(-1.0, 100.0, 100.0), "low-carb");
            assert!(matches!(
                errs.as_slice(),
                [ValidationError::OutOfRange {
                    field: Field::Fasting,
                    ..
                }]
            ));
        }
    }

    #[test]
    fn minimum_policy_allows_zero() {
        assert!(validate(ValidationPolicy::Minimum, &r(0.0, 0.0, 0.0), "keto").is_empty());
    }

    #[test]
    fn reports_all_violations_without_short_circuit() {
        let errs = validate(ValidationPolicy::Strict, &r(-5.0, 600.0, f64::NAN), "   ");
        assert_eq!(
            errs,
            vec![
                ValidationError::OutOfRange {
                    field: Field::Fasting,
                    value: -5.0,
                    min: 50.0,
                    max: 500.0
                },
                ValidationError::OutOfRange {
                    field: Field::PreMeal,
                    value: 600.0,
                    min: 70.0,
                    max: 500.0
                },
                ValidationError::NotANumber {
                    field: Field::PostMeal
                },
                ValidationError::EmptyPreference,
            ]
        );
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("Strict".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::Strict);
        assert_eq!(" minimum ".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::Minimum);
        assert!("lenient".parse::<ValidationPolicy>().is_err());
    }
}
