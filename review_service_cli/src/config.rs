//! Pipeline configuration sourced from environment variables.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::ConfigError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_VERSION: &str = "2024-09-01-preview";
pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Which flavour of chat-completions API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionProvider {
    OpenAi,
    Azure,
}

impl FromStr for CompletionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            other => Err(format!("expected \"openai\" or \"azure\", got {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub provider: CompletionProvider,
    /// Base URL. For Azure this is the resource endpoint.
    pub endpoint: String,
    pub api_key: String,
    /// Model name, or deployment name for Azure.
    pub model: String,
    pub api_version: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl CompletionConfig {
    /// OpenAI-compatible config with defaults for everything but the key.
    pub fn openai(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: CompletionProvider::OpenAi,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Browser binary; searched for when unset.
    pub browser_path: Option<PathBuf>,
    /// Fixed user agent; a random one from the pool when unset.
    pub user_agent: Option<String>,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub window_size: (u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            user_agent: None,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(1000),
            window_size: (1920, 1080),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub completion: CompletionConfig,
    pub renderer: RendererConfig,
    pub chunk_size: NonZeroUsize,
    /// How many chunks may be in flight with the model at once.
    pub concurrency: NonZeroUsize,
}

impl PipelineConfig {
    /// Read configuration from the process environment.
    ///
    /// Supported env vars:
    /// - `OPENAI_PROVIDER`: "openai" or "azure" (azure when `OPENAI_ENDPOINT` is set)
    /// - `OPENAI_ENDPOINT`, `OPENAI_API_KEY`, `DEPLOYMENT_NAME`, `API_VERSION`
    /// - `MAX_TOKENS`, `TEMPERATURE`, `COMPLETION_TIMEOUT_SECS`, `COMPLETION_MAX_RETRIES`
    /// - `CHUNK_SIZE`, `EXTRACT_CONCURRENCY`
    /// - `BROWSER_PATH`, `USER_AGENT`, `NAVIGATION_TIMEOUT_SECS`, `SETTLE_DELAY_MS`,
    ///   `WINDOW_WIDTH`, `WINDOW_HEIGHT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = get("OPENAI_ENDPOINT");
        let provider = match get("OPENAI_PROVIDER") {
            Some(raw) => parse_value("OPENAI_PROVIDER", &raw)?,
            None if endpoint.is_some() => CompletionProvider::Azure,
            None => CompletionProvider::OpenAi,
        };
        let endpoint = match (provider, endpoint) {
            (_, Some(endpoint)) => endpoint,
            (CompletionProvider::OpenAi, None) => OPENAI_BASE_URL.to_string(),
            (CompletionProvider::Azure, None) => {
                return Err(ConfigError::Missing("OPENAI_ENDPOINT"))
            }
        };

        let completion = CompletionConfig {
            provider,
            endpoint,
            api_key: get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            model: get("DEPLOYMENT_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_version: get("API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            max_tokens: parse_or(&get, "MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            temperature: parse_or(&get, "TEMPERATURE", 0.0)?,
            timeout: Duration::from_secs(parse_or(&get, "COMPLETION_TIMEOUT_SECS", 120)?),
            max_retries: parse_or(&get, "COMPLETION_MAX_RETRIES", 0)?,
        };

        let defaults = RendererConfig::default();
        let renderer = RendererConfig {
            browser_path: get("BROWSER_PATH").map(PathBuf::from),
            user_agent: get("USER_AGENT"),
            navigation_timeout: Duration::from_secs(parse_or(
                &get,
                "NAVIGATION_TIMEOUT_SECS",
                defaults.navigation_timeout.as_secs(),
            )?),
            settle_delay: Duration::from_millis(parse_or(
                &get,
                "SETTLE_DELAY_MS",
                defaults.settle_delay.as_millis() as u64,
            )?),
            window_size: (
                parse_or(&get, "WINDOW_WIDTH", defaults.window_size.0)?,
                parse_or(&get, "WINDOW_HEIGHT", defaults.window_size.1)?,
            ),
        };

        Ok(Self {
            completion,
            renderer,
            chunk_size: parse_or(&get, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            concurrency: parse_or(&get, "EXTRACT_CONCURRENCY", NonZeroUsize::MIN)?,
        })
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => parse_value(var, &raw),
        None => Ok(default),
    }
}
