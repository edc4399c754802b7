//! Error types for every pipeline stage.

use thiserror::Error;

/// Invalid or missing environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Anything that goes wrong while driving the browser.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no Chrome/Chromium executable found; set BROWSER_PATH")]
    BrowserNotFound,
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("navigation to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("failed to capture page content: {0}")]
    Snapshot(String),
}

/// Failures talking to the completion backend.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("invalid completion endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("API key is not a valid header value")]
    InvalidApiKey,
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("completion response had no message content")]
    EmptyResponse,
}

impl CompletionError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Transport(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
            CompletionError::InvalidEndpoint(_)
            | CompletionError::InvalidApiKey
            | CompletionError::EmptyResponse => false,
        }
    }
}

/// Why a single chunk contributed no records.
#[derive(Debug, Error)]
pub enum ChunkFailure {
    #[error("model output is not valid review JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Errors surfaced to callers of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("{0}")]
    Unhandled(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Unhandled(format!("background task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        let rate_limited = CompletionError::Api {
            status: 429,
            body: String::new(),
        };
        let unavailable = CompletionError::Api {
            status: 503,
            body: String::new(),
        };
        let unauthorized = CompletionError::Api {
            status: 401,
            body: String::new(),
        };
        assert!(rate_limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!unauthorized.is_transient());
        assert!(!CompletionError::EmptyResponse.is_transient());
    }

    #[test]
    fn render_errors_read_as_render_failures() {
        let err: PipelineError = RenderError::Timeout {
            url: "https://example.com".to_string(),
            secs: 30,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "render failed: navigation to https://example.com timed out after 30s"
        );
    }
}
