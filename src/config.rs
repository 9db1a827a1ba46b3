use crate::readings::validator::ValidationPolicy;
use crate::sensor::SensorKind;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl GeneratorConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    pub const DEFAULT_MODEL: &'static str = "llama3-8b-8192";
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_TOKENS: u32 = 250;
    /// Upper bound on retries after the first attempt.
    pub const MAX_RETRIES: u32 = 5;

    /// Defaults for everything but the credential.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            model: Self::DEFAULT_MODEL.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            timeout_secs: 30,
            max_retries: 1,
        }
    }

    /// Rejects a zero timeout and clamps the retry budget.
    pub fn checked(mut self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            self.timeout_secs > 0,
            "GENERATOR_TIMEOUT_SECS must be greater than zero"
        );
        self.max_retries = self.max_retries.min(Self::MAX_RETRIES);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub generator: GeneratorConfig,
    pub validation_policy: ValidationPolicy,
    pub sensor: SensorKind,
    pub default_user_id: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://glucoguide.db?mode=rwc".into());

        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| anyhow::anyhow!("GROQ_API_KEY must be set"))?;
        let mut generator = GeneratorConfig::with_api_key(api_key);
        if let Ok(v) = std::env::var("GENERATOR_BASE_URL") {
            generator.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("GENERATOR_MODEL") {
            generator.model = v;
        }
        generator.temperature = parse_env("GENERATOR_TEMPERATURE", generator.temperature);
        generator.max_tokens = parse_env("GENERATOR_MAX_TOKENS", generator.max_tokens);
        generator.timeout_secs = parse_env("GENERATOR_TIMEOUT_SECS", generator.timeout_secs);
        generator.max_retries = parse_env("GENERATOR_MAX_RETRIES", generator.max_retries);
        let generator = generator.checked()?;

        let validation_policy = match std::env::var("VALIDATION_POLICY") {
            Ok(v) => v.parse::<ValidationPolicy>()?,
            Err(_) => ValidationPolicy::default(),
        };

        let sensor = match std::env::var("SENSOR") {
            Ok(v) => v.parse::<SensorKind>()?,
            Err(_) => SensorKind::default(),
        };

        let default_user_id =
            std::env::var("DEFAULT_USER_ID").unwrap_or_else(|_| "default".into());

        Ok(Self {
            database_url,
            generator,
            validation_policy,
            sensor,
            default_user_id,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
