use crate::enrichment::QuestionKind;
use crate::providers::{ProviderKind, QuizParams, SummaryParams};
use crate::retry::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const DEFAULT_SUMMARY_TRUNCATE_CHARS: usize = 2048;
const DEFAULT_QUESTION_TRUNCATE_CHARS: usize = 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OVERALL_TIMEOUT_SECS: u64 = 60;
const MAX_OVERALL_TIMEOUT_SECS: u64 = 86_400;
const DEFAULT_MAX_INPUT_CHARS: usize = 20_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Connection and input settings for one provider backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Backend implementation to use.
    pub kind: ProviderKind,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Secret passed to the provider, when it requires one.
    pub api_key: Option<String>,
    /// Model identifier understood by the provider (ignored by the quiz API).
    pub model: String,
    /// Maximum number of characters of document text transmitted per call.
    pub truncate_at: usize,
    /// Timeout applied to each individual HTTP call.
    pub request_timeout: Duration,
}

impl ProviderSettings {
    /// Settings pointing at the default endpoint and model for `kind`.
    pub fn for_kind(kind: ProviderKind, truncate_at: usize) -> Self {
        let (base_url, model) = match kind {
            ProviderKind::OpenAiChat => (DEFAULT_OPENAI_URL, DEFAULT_OPENAI_MODEL),
            ProviderKind::Ollama => (DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL),
            ProviderKind::QuizApi => ("", ""),
        };
        Self {
            kind,
            base_url: base_url.to_string(),
            api_key: None,
            model: model.to_string(),
            truncate_at,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Everything the enrichment pipeline needs, constructed once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentConfig {
    /// Backend used for the summary path.
    pub summary: ProviderSettings,
    /// Backend used for the question path.
    pub questions: ProviderSettings,
    /// Summary options forwarded to the summary backend.
    pub summary_params: SummaryParams,
    /// Quiz options forwarded to the question backend.
    pub quiz: QuizParams,
    /// Retry behavior applied to each path.
    pub retry: RetryPolicy,
    /// Deadline covering both paths, including retry waits.
    pub overall_timeout: Duration,
    /// Input budget used when callers do not provide one.
    pub default_max_input_length: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            summary: ProviderSettings::for_kind(
                ProviderKind::OpenAiChat,
                DEFAULT_SUMMARY_TRUNCATE_CHARS,
            ),
            questions: ProviderSettings::for_kind(
                ProviderKind::OpenAiChat,
                DEFAULT_QUESTION_TRUNCATE_CHARS,
            ),
            summary_params: SummaryParams::default(),
            quiz: QuizParams::default(),
            retry: RetryPolicy::default(),
            overall_timeout: Duration::from_secs(DEFAULT_OVERALL_TIMEOUT_SECS),
            default_max_input_length: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

impl EnrichmentConfig {
    /// Load configuration from process environment variables, after reading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, performing validation along the way.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);
        let defaults = Self::default();

        let summary = provider_settings(&vars, "SUMMARY", DEFAULT_SUMMARY_TRUNCATE_CHARS)?;
        let questions = provider_settings(&vars, "QUESTION", DEFAULT_QUESTION_TRUNCATE_CHARS)?;

        let question_types = match vars.optional("QUIZ_QUESTION_TYPES") {
            Some(raw) => parse_question_types(&raw)?,
            None => defaults.quiz.question_types,
        };
        let count = vars
            .parse::<u32>("QUIZ_QUESTION_COUNT")?
            .unwrap_or(defaults.quiz.count);
        if count == 0 {
            return Err(ConfigError::InvalidValue("QUIZ_QUESTION_COUNT".into()));
        }

        let max_attempts = vars
            .parse::<u32>("RETRY_MAX_ATTEMPTS")?
            .unwrap_or(defaults.retry.max_attempts);
        let base_delay = vars
            .parse::<u64>("RETRY_BASE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.base_delay);

        let overall_timeout = match vars.parse::<u64>("ENRICH_TIMEOUT_SECS")? {
            Some(secs) if (1..=MAX_OVERALL_TIMEOUT_SECS).contains(&secs) => {
                Duration::from_secs(secs)
            }
            Some(_) => return Err(ConfigError::InvalidValue("ENRICH_TIMEOUT_SECS".into())),
            None => defaults.overall_timeout,
        };
        let default_max_input_length = vars
            .parse::<usize>("ENRICH_MAX_INPUT_CHARS")?
            .unwrap_or(defaults.default_max_input_length);
        if default_max_input_length == 0 {
            return Err(ConfigError::InvalidValue("ENRICH_MAX_INPUT_CHARS".into()));
        }

        Ok(Self {
            summary,
            questions,
            summary_params: SummaryParams {
                word_target: vars.parse::<u32>("SUMMARY_WORD_TARGET")?,
            },
            quiz: QuizParams {
                question_types,
                count,
            },
            retry: RetryPolicy {
                max_attempts: max_attempts.max(1),
                base_delay,
            },
            overall_timeout,
            default_max_input_length,
        })
    }
}

/// Process-level configuration: pipeline settings plus the HTTP listener.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pipeline configuration threaded into the enrichment service.
    pub enrichment: EnrichmentConfig,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| env::var(key).ok();
        Ok(Self {
            enrichment: EnrichmentConfig::from_lookup(lookup)?,
            server_port: Vars(&lookup).parse::<u16>("SERVER_PORT")?,
        })
    }

    /// Read `.env` (when present) and the environment, logging the resolved providers.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        tracing::debug!(
            summary_provider = config.enrichment.summary.kind.as_str(),
            summary_url = %config.enrichment.summary.base_url,
            question_provider = config.enrichment.questions.kind.as_str(),
            question_url = %config.enrichment.questions.base_url,
            max_attempts = config.enrichment.retry.max_attempts,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))
            })
            .transpose()
    }
}

fn provider_settings<F>(
    vars: &Vars<'_, F>,
    prefix: &str,
    default_truncate: usize,
) -> Result<ProviderSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let kind_key = format!("{prefix}_PROVIDER");
    let kind = match vars.optional(&kind_key) {
        Some(raw) => raw
            .parse::<ProviderKind>()
            .map_err(|()| ConfigError::InvalidValue(kind_key.clone()))?,
        None => ProviderKind::OpenAiChat,
    };

    let truncate_key = format!("{prefix}_TRUNCATE_CHARS");
    let truncate_at = vars
        .parse::<usize>(&truncate_key)?
        .unwrap_or(default_truncate);
    if truncate_at == 0 {
        return Err(ConfigError::InvalidValue(truncate_key));
    }

    let mut settings = ProviderSettings::for_kind(kind, truncate_at);

    let url_key = format!("{prefix}_BASE_URL");
    match vars.optional(&url_key) {
        Some(url) => settings.base_url = url.trim().to_string(),
        None if settings.base_url.is_empty() => return Err(ConfigError::MissingVariable(url_key)),
        None => {}
    }
    if let Some(model) = vars.optional(&format!("{prefix}_MODEL")) {
        settings.model = model.trim().to_string();
    }
    settings.api_key = vars.optional(&format!("{prefix}_API_KEY"));
    if let Some(secs) = vars.parse::<u64>(&format!("{prefix}_REQUEST_TIMEOUT_SECS"))? {
        settings.request_timeout = Duration::from_secs(secs);
    }

    Ok(settings)
}

fn parse_question_types(raw: &str) -> Result<Vec<QuestionKind>, ConfigError> {
    let mut kinds = Vec::new();
    for label in raw.split(',').map(str::trim).filter(|label| !label.is_empty()) {
        let kind = QuestionKind::parse_label(label)
            .ok_or_else(|| ConfigError::InvalidValue("QUIZ_QUESTION_TYPES".into()))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        return Err(ConfigError::InvalidValue("QUIZ_QUESTION_TYPES".into()));
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = EnrichmentConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, EnrichmentConfig::default());
        assert_eq!(config.summary.truncate_at, 2048);
        assert_eq!(config.questions.truncate_at, 1024);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn provider_overrides_are_read_per_path() {
        let config = EnrichmentConfig::from_lookup(lookup(&[
            ("SUMMARY_PROVIDER", "ollama"),
            ("SUMMARY_MODEL", "mistral"),
            ("QUESTION_PROVIDER", "quiz"),
            ("QUESTION_BASE_URL", "https://quiz.example.org"),
            ("QUESTION_API_KEY", "secret"),
            ("QUESTION_TRUNCATE_CHARS", "512"),
            ("QUIZ_QUESTION_TYPES", "mcq, short_answer, mcq"),
            ("QUIZ_QUESTION_COUNT", "8"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("RETRY_BASE_DELAY_MS", "250"),
        ]))
        .expect("config");

        assert_eq!(config.summary.kind, ProviderKind::Ollama);
        assert_eq!(config.summary.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.summary.model, "mistral");
        assert_eq!(config.questions.kind, ProviderKind::QuizApi);
        assert_eq!(config.questions.api_key.as_deref(), Some("secret"));
        assert_eq!(config.questions.truncate_at, 512);
        assert_eq!(
            config.quiz.question_types,
            vec![QuestionKind::MultipleChoice, QuestionKind::ShortAnswer]
        );
        assert_eq!(config.quiz.count, 8);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn quiz_provider_requires_base_url() {
        let error = EnrichmentConfig::from_lookup(lookup(&[("QUESTION_PROVIDER", "quiz")]))
            .expect_err("missing url");
        assert_eq!(
            error,
            ConfigError::MissingVariable("QUESTION_BASE_URL".into())
        );
    }

    #[test]
    fn invalid_values_are_reported_by_key() {
        let error = EnrichmentConfig::from_lookup(lookup(&[("SUMMARY_TRUNCATE_CHARS", "lots")]))
            .expect_err("invalid");
        assert_eq!(
            error,
            ConfigError::InvalidValue("SUMMARY_TRUNCATE_CHARS".into())
        );

        let error = EnrichmentConfig::from_lookup(lookup(&[("SUMMARY_PROVIDER", "cohere")]))
            .expect_err("unknown provider");
        assert_eq!(error, ConfigError::InvalidValue("SUMMARY_PROVIDER".into()));
    }

    #[test]
    fn overall_timeout_must_be_positive_and_bounded() {
        for raw in ["0", "86401", "18446744073709551615"] {
            let error = EnrichmentConfig::from_lookup(lookup(&[("ENRICH_TIMEOUT_SECS", raw)]))
                .expect_err("out of range");
            assert_eq!(error, ConfigError::InvalidValue("ENRICH_TIMEOUT_SECS".into()));
        }

        let config = EnrichmentConfig::from_lookup(lookup(&[("ENRICH_TIMEOUT_SECS", "90")]))
            .expect("config");
        assert_eq!(config.overall_timeout, Duration::from_secs(90));
    }

    #[test]
    fn dotenv_entries_feed_the_lookup() {
        let path = std::env::temp_dir().join(format!("docenrich-{}.env", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "# local overrides\nENRICH_TIMEOUT_SECS=15\nQUIZ_QUESTION_COUNT=\"3\"\n",
        )
        .expect("write env file");
        let entries: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .expect("env file")
            .collect::<Result<_, _>>()
            .expect("entries");
        std::fs::remove_file(&path).ok();

        let config = EnrichmentConfig::from_lookup(move |key: &str| entries.get(key).cloned())
            .expect("config");
        assert_eq!(config.overall_timeout, Duration::from_secs(15));
        assert_eq!(config.quiz.count, 3);
    }
}
