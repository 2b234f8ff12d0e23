//! Runtime configuration, read from the environment (and `.env` if present).

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::DEFAULT_MAX_PROMPT_CHARS;
use crate::pipeline::PipelineConfig;
use crate::secrets::resolve_secret_optional;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_DATABASE_PATH: &str = "gitdigger.db";
pub const DEFAULT_UPLOAD_DIR: &str = "uploaded_files";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_SIMULATION_DELAY_SECS: u64 = 30;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'text' or 'json', got '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub github_api_url: String,
    pub github_token: Option<SecretString>,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub gemini_api_key: Option<SecretString>,
    /// Let the model ground its answer with web search.
    pub llm_grounding: bool,
    pub max_prompt_chars: usize,
    pub simulation_delay: Duration,
    pub worker_count: usize,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads `.env` (if present) and reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let github_token = resolve_secret_optional(
            get("GITHUB_ACCESS_TOKEN").as_deref(),
            get("GITHUB_ACCESS_TOKEN_FILE").as_deref(),
            Some("GITHUB_TOKEN"),
        )
        .map_err(|source| ConfigError::Secret {
            key: "GITHUB_ACCESS_TOKEN",
            source,
        })?;

        let gemini_api_key = resolve_secret_optional(
            get("GEMINI_API_KEY").as_deref(),
            get("GEMINI_API_KEY_FILE").as_deref(),
            Some("GOOGLE_API_KEY"),
        )
        .map_err(|source| ConfigError::Secret {
            key: "GEMINI_API_KEY",
            source,
        })?;

        Ok(Self {
            bind_address: parse_or(
                "BIND_ADDRESS",
                get("BIND_ADDRESS"),
                DEFAULT_BIND_ADDRESS.parse().ok(),
            )?,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            github_api_url: get("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            github_token,
            gemini_api_url: get("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_key,
            llm_grounding: parse_bool("LLM_GROUNDING", get("LLM_GROUNDING"), true)?,
            max_prompt_chars: parse_or(
                "MAX_PROMPT_CHARS",
                get("MAX_PROMPT_CHARS"),
                Some(DEFAULT_MAX_PROMPT_CHARS),
            )?,
            simulation_delay: Duration::from_secs(parse_or(
                "SIMULATION_DELAY_SECS",
                get("SIMULATION_DELAY_SECS"),
                Some(DEFAULT_SIMULATION_DELAY_SECS),
            )?),
            worker_count: positive(
                "WORKER_COUNT",
                parse_or("WORKER_COUNT", get("WORKER_COUNT"), Some(num_cpus::get()))?,
            )?,
            log_format: parse_or("LOG_FORMAT", get("LOG_FORMAT"), Some(LogFormat::Text))?,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::with_delay(self.simulation_delay)
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value,
            reason: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::InvalidValue {
            key,
            value: String::new(),
            reason: "no value and no default".to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn positive(key: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
