use crate::services::providers::GenerationParams;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default upper bound on a single generation call.
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

/// Default JSON body limit (1 MiB).
const DEFAULT_BODY_LIMIT_BYTES: usize = 1_048_576;

#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub generation: GenerationConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub provider: ProviderKind,
    /// May be empty: a missing credential fails the first generation call,
    /// not startup.
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Sampling temperature; the provider default applies when unset.
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<i32>,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub input_mode: InputMode,
    /// Directory for transient PDF files.
    pub temp_dir: PathBuf,
    /// Pre-built intake front-end; not served when absent.
    pub static_dir: Option<PathBuf>,
    pub body_limit_bytes: usize,
}

/// Which generation backend to talk to.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Mock,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4.1-mini",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Mock => "mock",
        }
    }

    fn api_key_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Gemini => Some("GOOGLE_API_KEY"),
            ProviderKind::Mock => None,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(format!("Invalid generation provider: {}", s)),
        }
    }
}

/// Shape of the request body the pipeline expects.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Flat intake fields (`businessName`, `contactName`, ...).
    Fields,
    /// A single nested `answers` object forwarded as-is.
    Answers,
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fields" => Ok(InputMode::Fields),
            "answers" => Ok(InputMode::Answers),
            _ => Err(format!("Invalid report input mode: {}", s)),
        }
    }
}

impl AssessmentConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let provider: ProviderKind = get_env("GENERATION_PROVIDER", Some("openai"))?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let api_key = provider
            .api_key_var()
            .and_then(|var| env::var(var).ok())
            .unwrap_or_default();

        if api_key.is_empty() && provider != ProviderKind::Mock {
            tracing::warn!(
                provider = ?provider,
                "No API key configured; report generation will fail until one is set"
            );
        }

        Ok(AssessmentConfig {
            common: common_config,
            generation: GenerationConfig {
                provider,
                api_key,
                model: get_env("GENERATION_MODEL", Some(provider.default_model()))?,
                base_url: env::var("GENERATION_BASE_URL").ok().filter(|s| !s.is_empty()),
                timeout_secs: parse_env(
                    "GENERATION_TIMEOUT_SECS",
                    DEFAULT_GENERATION_TIMEOUT_SECS,
                )?,
                temperature: parse_optional_env("GENERATION_TEMPERATURE")?,
                max_output_tokens: parse_optional_env("GENERATION_MAX_TOKENS")?,
            },
            report: ReportConfig {
                input_mode: get_env("REPORT_INPUT_MODE", Some("fields"))?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                temp_dir: env::var("REPORT_TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir()),
                static_dir: Some(PathBuf::from(get_env("REPORT_STATIC_DIR", Some("public"))?)),
                body_limit_bytes: parse_env(
                    "REPORT_BODY_LIMIT_BYTES",
                    DEFAULT_BODY_LIMIT_BYTES,
                )?,
            },
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()))?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e)))
}

/// Unset or blank means `None`; anything else must parse.
fn parse_optional_env<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().parse().map(Some).map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e))
        }),
        _ => Ok(None),
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_mode_parses_case_insensitively() {
        assert_eq!("fields".parse::<InputMode>(), Ok(InputMode::Fields));
        assert_eq!("ANSWERS".parse::<InputMode>(), Ok(InputMode::Answers));
        assert!("flat".parse::<InputMode>().is_err());
    }

    #[test]
    fn provider_kind_parses_known_backends() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!("mock".parse::<ProviderKind>(), Ok(ProviderKind::Mock));
        assert!("claude-ish".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn openai_defaults_to_mini_model() {
        assert_eq!(ProviderKind::OpenAi.default_model(), "gpt-4.1-mini");
    }

    #[test]
    fn missing_key_without_default_is_a_config_error() {
        let err = get_env("ASSESSMENT_TEST_SURELY_UNSET_KEY", None).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn optional_numbers_are_none_when_unset_and_checked_when_set() {
        let unset: Option<f32> = parse_optional_env("ASSESSMENT_TEST_UNSET_TEMPERATURE").unwrap();
        assert_eq!(unset, None);

        env::set_var("ASSESSMENT_TEST_MAX_TOKENS", " 2048 ");
        let tokens: Option<i32> = parse_optional_env("ASSESSMENT_TEST_MAX_TOKENS").unwrap();
        assert_eq!(tokens, Some(2048));

        env::set_var("ASSESSMENT_TEST_BAD_TEMPERATURE", "hot");
        let err = parse_optional_env::<f32>("ASSESSMENT_TEST_BAD_TEMPERATURE").unwrap_err();
        assert!(err.to_string().contains("ASSESSMENT_TEST_BAD_TEMPERATURE is invalid"));
    }

    #[test]
    fn generation_params_come_from_config() {
        let config = GenerationConfig {
            provider: ProviderKind::Mock,
            api_key: String::new(),
            model: "mock".to_string(),
            base_url: None,
            timeout_secs: 5,
            temperature: Some(0.2),
            max_output_tokens: Some(1500),
        };

        let params = config.params();
        assert_eq!(params.temperature, Some(0.2));
        assert_eq!(params.max_tokens, Some(1500));
    }

    #[test]
    fn defaulted_key_falls_back() {
        let value = get_env("ASSESSMENT_TEST_SURELY_UNSET_KEY", Some("x")).unwrap();
        assert_eq!(value, "x");
    }
}
