use anyhow::{Context, Result};
use extract::{DEFAULT_AMOUNT, DEFAULT_CURRENCY, ExtractorConfig, OpenAiClient, RetryPolicy};
use ingest::{ChunkError, ChunkerConfig};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Keywords that mark a paragraph as talking about a funding opportunity.
pub const DEFAULT_KEYWORDS: [&str; 22] = [
    "convocatoria",
    "grant",
    "funding",
    "beca",
    "premio",
    "award",
    "RFP",
    "request for proposal",
    "concurso",
    "subsidio",
    "financiamiento",
    "apoyo",
    "fondo",
    "call for proposals",
    "fellowship",
    "scholarship",
    "subvención",
    "ayuda",
    "dotación",
    "patrocinio",
    "call",
    "opportunity",
];

/// Everything a pipeline run reads. Callers own the value and pass a fresh
/// copy into each run; updates go through [`PipelineConfig::apply`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub llm: LlmConfig,
    pub chunking: ChunkerConfig,
    pub retry: RetryConfig,
    pub keep_closed: bool,
    /// Output language code, e.g. `ES` or `EN`
    pub language: String,
    pub amount_placeholder: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per chunk, including the first
    pub max_retries: usize,
    /// Fixed pause between attempts and between consecutive chunk calls
    pub delay_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4-turbo-preview".to_string(),
                temperature: 0.3,
                request_timeout_secs: 120,
            },
            chunking: ChunkerConfig::default(),
            retry: RetryConfig {
                max_retries: 3,
                delay_secs: 1.0,
            },
            keep_closed: false,
            language: "ES".to_string(),
            amount_placeholder: DEFAULT_AMOUNT.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Partial update accepted by [`PipelineConfig::apply`]. Unset fields keep
/// their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub max_chunks: Option<usize>,
    pub keep_closed: Option<bool>,
    pub language: Option<String>,
    pub max_retries: Option<usize>,
    pub delay_secs: Option<f64>,
    pub amount_placeholder: Option<String>,
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Chunking(#[from] ChunkError),
    #[error("temperature must be between 0 and 2, got {0}")]
    Temperature(f32),
    #[error("retry delay must be a non-negative number of seconds that fits a duration")]
    Delay,
}

impl PipelineConfig {
    /// Defaults overridden by environment variables. Call `dotenvy::dotenv()`
    /// first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let keywords = match std::env::var("KEYWORDS") {
            Ok(raw) => parse_keywords(&raw),
            Err(_) => defaults.keywords,
        };

        let config = Self {
            llm: LlmConfig {
                base_url: env_or("LLM_BASE_URL", defaults.llm.base_url)?,
                api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
                model: env_or("OPENAI_MODEL", defaults.llm.model)?,
                temperature: env_or("OPENAI_TEMPERATURE", defaults.llm.temperature)?,
                request_timeout_secs: env_or("LLM_TIMEOUT_SECS", defaults.llm.request_timeout_secs)?,
            },
            chunking: ChunkerConfig {
                chunk_size: env_or("CHUNK_SIZE", defaults.chunking.chunk_size)?,
                overlap: env_or("CHUNK_OVERLAP", defaults.chunking.overlap)?,
                max_chunks: env_or("MAX_CHUNKS_PER_DOC", defaults.chunking.max_chunks)?,
            },
            retry: RetryConfig {
                max_retries: env_or("MAX_RETRIES", defaults.retry.max_retries)?,
                delay_secs: env_or("RATE_LIMIT_DELAY", defaults.retry.delay_secs)?,
            },
            keep_closed: env_or("KEEP_CLOSED", defaults.keep_closed)?,
            language: env_or("LANGUAGE_OUTPUT", defaults.language)?,
            amount_placeholder: env_or("AMOUNT_PLACEHOLDER", defaults.amount_placeholder)?,
            keywords,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Temperature(self.llm.temperature));
        }
        // Rejects NaN, negatives and values too large for a Duration
        Duration::try_from_secs_f64(self.retry.delay_secs).map_err(|_| ConfigError::Delay)?;
        Ok(())
    }

    /// Apply `update` only if the result is valid; on error `self` is left
    /// untouched.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let mut next = self.clone();

        if let Some(model) = update.model {
            next.llm.model = model;
        }
        if let Some(temperature) = update.temperature {
            next.llm.temperature = temperature;
        }
        if let Some(chunk_size) = update.chunk_size {
            next.chunking.chunk_size = chunk_size;
        }
        if let Some(overlap) = update.chunk_overlap {
            next.chunking.overlap = overlap;
        }
        if let Some(max_chunks) = update.max_chunks {
            next.chunking.max_chunks = max_chunks;
        }
        if let Some(keep_closed) = update.keep_closed {
            next.keep_closed = keep_closed;
        }
        if let Some(language) = update.language {
            next.language = language.trim().to_uppercase();
        }
        if let Some(max_retries) = update.max_retries {
            next.retry.max_retries = max_retries;
        }
        if let Some(delay) = update.delay_secs {
            next.retry.delay_secs = delay;
        }
        if let Some(placeholder) = update.amount_placeholder {
            next.amount_placeholder = placeholder;
        }
        if let Some(keywords) = update.keywords {
            next.keywords = keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Pause between attempts and chunk calls. Zero for a delay that fails
    /// [`PipelineConfig::validate`].
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry.delay_secs).unwrap_or_default()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries, self.delay())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            temperature: self.llm.temperature,
            language: self.language.clone(),
            amount_placeholder: self.amount_placeholder.clone(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            retry: self.retry_policy(),
        }
    }

    pub fn build_model(&self) -> Result<OpenAiClient> {
        OpenAiClient::new(
            self.llm.base_url.clone(),
            self.llm.api_key.clone(),
            self.llm.model.clone(),
            Duration::from_secs(self.llm.request_timeout_secs),
        )
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        _ => Ok(default),
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keywords.len(), 22);
        assert_eq!(config.chunking.chunk_size, 6000);
        assert_eq!(config.retry_policy().max_attempts(), 3);
    }

    #[test]
    fn test_apply_updates_fields() {
        let mut config = PipelineConfig::default();
        config
            .apply(ConfigUpdate {
                chunk_size: Some(800),
                chunk_overlap: Some(100),
                keep_closed: Some(true),
                language: Some(" en ".to_string()),
                keywords: Some(vec!["grant".into(), "  ".into(), " beca ".into()]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 100);
        assert!(config.keep_closed);
        assert_eq!(config.language, "EN");
        assert_eq!(config.keywords, vec!["grant", "beca"]);
    }

    #[test]
    fn test_invalid_update_leaves_config_untouched() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply(ConfigUpdate {
                chunk_size: Some(400),
                chunk_overlap: Some(400),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Chunking(ChunkError::OverlapTooLarge {
                overlap: 400,
                chunk_size: 400
            })
        );
        assert_eq!(config.chunking, ChunkerConfig::default());

        assert!(config
            .apply(ConfigUpdate {
                temperature: Some(5.0),
                ..Default::default()
            })
            .is_err());
        assert!(config
            .apply(ConfigUpdate {
                delay_secs: Some(-1.0),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_delay_too_large_for_a_duration_is_rejected() {
        let mut config = PipelineConfig::default();

        let err = config
            .apply(ConfigUpdate {
                delay_secs: Some(1e20),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(err, ConfigError::Delay);
        assert_eq!(config.retry.delay_secs, 1.0);

        config.retry.delay_secs = 1e20;
        assert_eq!(config.validate(), Err(ConfigError::Delay));
        assert_eq!(config.delay(), Duration::ZERO);
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let mut config = PipelineConfig::default();
        config.llm.api_key = "sk-secret".to_string();

        let json = serde_json::to_string(&config).unwrap();

        assert!(!json.contains("sk-secret"));
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_extractor_config_follows_pipeline_config() {
        let mut config = PipelineConfig::default();
        config.retry.delay_secs = 0.25;
        config.amount_placeholder = "TBD".to_string();

        let extractor = config.extractor_config();

        assert_eq!(extractor.amount_placeholder, "TBD");
        assert_eq!(extractor.retry.delay(), Duration::from_millis(250));
        assert_eq!(extractor.language, "ES");
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_keywords("grant, beca,,call for proposals "),
            vec!["grant", "beca", "call for proposals"]
        );
    }
}
