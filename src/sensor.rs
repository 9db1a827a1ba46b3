//! Pluggable source of wearable glucose readings.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::readings::dto::GlucoseReadings;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("glucose sensor unavailable: {0}")]
pub struct SensorUnavailable(pub String);

#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn read(&self) -> Result<GlucoseReadings, SensorUnavailable>;
}

/// Stand-in wearable that always reports the same readings.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSensor {
    readings: GlucoseReadings,
}

impl SimulatedSensor {
    pub fn new(readings: GlucoseReadings) -> Self {
        Self { readings }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new(GlucoseReadings {
            fasting: 110.0,
            pre_meal: 120.0,
            post_meal: 160.0,
        })
    }
}

#[async_trait]
impl SensorSource for SimulatedSensor {
    async fn read(&self) -> Result<GlucoseReadings, SensorUnavailable> {
        Ok(self.readings)
    }
}

/// Used when no wearable is connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

#[async_trait]
impl SensorSource for NoSensor {
    async fn read(&self) -> Result<GlucoseReadings, SensorUnavailable> {
        Err(SensorUnavailable("no wearable connected".into()))
    }
}

/// Which [`SensorSource`] the server wires in, selected by `SENSOR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SensorKind {
    #[default]
    Simulated,
    None,
}

impl SensorKind {
    pub fn build(self) -> Arc<dyn SensorSource> {
        match self {
            SensorKind::Simulated => Arc::new(SimulatedSensor::default()),
            SensorKind::None => Arc::new(NoSensor),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown sensor `{0}` (expected `simulated` or `none`)")]
pub struct ParseSensorError(String);

impl FromStr for SensorKind {
    type Err = ParseSensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "none" => Ok(Self::None),
            other => Err(ParseSensorError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_kind_parses_from_config_strings() {
        assert_eq!("Simulated".parse::<SensorKind>().unwrap(), SensorKind::Simulated);
        assert_eq!(" none ".parse::<SensorKind>().unwrap(), SensorKind::None);
        assert!("fitbit".parse::<SensorKind>().is_err());
    }

    #[tokio::test]
    async fn sensor_kind_builds_matching_source() {
        assert!(SensorKind::Simulated.build().read().await.is_ok());
        assert!(SensorKind::None.build().read().await.is_err());
    }

    #[tokio::test]
    async fn simulated_sensor_returns_fixed_values() {
        let r = SimulatedSensor::default().read().await.unwrap();
        assert_eq!((r.fasting, r.pre_meal, r.post_meal), (110.0, 120.0, 160.0));
    }

    #[tokio::test]
    async fn missing_sensor_reports_unavailable() {
        let err = NoSensor.read().await.unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
