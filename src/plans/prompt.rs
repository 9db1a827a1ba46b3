use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::readings::dto::GlucoseReadings;

pub const SYSTEM_ROLE: &str =
    "You are a world-class nutritionist who specializes in diabetes management.";

/// Everything the generation service needs for one meal plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub system_role: String,
    pub user_text: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Model parameters attached to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl From<&GeneratorConfig> for ModelParams {
    fn from(cfg: &GeneratorConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_tokens,
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: GeneratorConfig::DEFAULT_MODEL.into(),
            temperature: GeneratorConfig::DEFAULT_TEMPERATURE,
            max_output_tokens: GeneratorConfig::DEFAULT_MAX_TOKENS,
        }
    }
}

/// Pure template; the preference is interpolated as-is after trimming.
pub fn build(
    readings: &GlucoseReadings,
    preference: &str,
    params: &ModelParams,
) -> GenerationRequest {
    let user_text = format!(
        "My fasting sugar level is {} mg/dL, \
         my pre-meal sugar level is {} mg/dL, \
         and my post-meal sugar level is {} mg/dL. \
         My dietary preferences are {}. \
         Please provide a personalized meal plan that can help me manage my blood sugar levels effectively.",
        readings.fasting,
        readings.pre_meal,
        readings.post_meal,
        preference.trim(),
    );

    GenerationRequest {
        system_role: SYSTEM_ROLE.to_string(),
        user_text,
        model: params.model.clone(),
        temperature: params.temperature,
        max_output_tokens: params.max_output_tokens,
    }
}
