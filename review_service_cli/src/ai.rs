use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoffBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::config::{CompletionConfig, CompletionProvider};
use crate::error::CompletionError;

/// "Given text, return a completion string."
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI and Azure OpenAI.
pub struct OpenAiClient {
    client: reqwest::Client,
    url: Url,
    headers: HeaderMap,
    config: CompletionConfig,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let url = completions_url(&config)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let (name, value) = match config.provider {
            CompletionProvider::OpenAi => (AUTHORIZATION, format!("Bearer {}", config.api_key)),
            CompletionProvider::Azure => (HeaderName::from_static("api-key"), config.api_key.clone()),
        };
        let mut value =
            HeaderValue::from_str(&value).map_err(|_| CompletionError::InvalidApiKey)?;
        value.set_sensitive(true);
        headers.insert(name, value);

        Ok(Self {
            client: reqwest::Client::builder().timeout(config.timeout).build()?,
            url,
            headers,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.url
    }

    async fn send_once(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": false
        });

        let response = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result = response.json::<ChatResponse>().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let attempts = &AtomicU32::new(0);
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        retry_notify(
            backoff,
            move || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                debug!(attempt, chars = user.len(), "requesting completion");
                match self.send_once(system, user).await {
                    Ok(text) => Ok(text),
                    Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                        Err(backoff::Error::transient(e))
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            },
            |err: CompletionError, wait: Duration| {
                warn!("completion failed, retrying in {:?}: {}", wait, err);
            },
        )
        .await
    }
}

fn completions_url(config: &CompletionConfig) -> Result<Url, CompletionError> {
    let base = config.endpoint.trim_end_matches('/');
    match config.provider {
        CompletionProvider::OpenAi => Ok(Url::parse(&format!("{}/chat/completions", base))?),
        CompletionProvider::Azure => {
            let mut url = Url::parse(&format!(
                "{}/openai/deployments/{}/chat/completions",
                base, config.model
            ))?;
            url.query_pairs_mut()
                .append_pair("api-version", &config.api_version);
            Ok(url)
        }
    }
}
