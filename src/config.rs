//! Service configuration read from the environment

use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required (or set USE_MOCK_LLM=true)")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
}

/// Which generation provider answers requests
#[derive(Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI { api_key: String },
    Canned,
}

impl std::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI { .. } => f.write_str("OpenAI { api_key: <redacted> }"),
            Self::Canned => f.write_str("Canned"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Redis,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: String,
    /// Expiry applied to durable records
    pub ttl: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parse_or(var("PORT"), "PORT", DEFAULT_PORT)?;

        let use_mock = match var("USE_MOCK_LLM") {
            None => false,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "USE_MOCK_LLM",
                value,
            })?,
        };
        let backend = if use_mock {
            LlmBackend::Canned
        } else {
            let api_key = var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
            LlmBackend::OpenAI { api_key }
        };
        let llm = LlmConfig {
            backend,
            model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(
                var("LLM_TIMEOUT_SECS"),
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
        };

        let storage_backend = match var("STORAGE_BACKEND") {
            None => StorageBackend::Memory,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "memory" | "in-memory" | "in_memory" => StorageBackend::Memory,
                "redis" | "durable" => StorageBackend::Redis,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "STORAGE_BACKEND",
                        value,
                    })
                }
            },
        };
        let ttl = match var("CONVERSATION_TTL_SECS") {
            None => None,
            Some(value) => Some(Duration::from_secs(parse_or(
                Some(value),
                "CONVERSATION_TTL_SECS",
                0,
            )?)),
        }
        .filter(|d| !d.is_zero());
        let storage = StorageConfig {
            backend: storage_backend,
            redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            ttl,
        };

        Ok(Self { port, llm, storage })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
