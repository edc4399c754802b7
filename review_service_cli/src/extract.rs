//! Per-chunk review extraction through the completion capability.

use std::num::NonZeroUsize;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::CompletionClient;
use crate::error::ChunkFailure;
use crate::report::ReviewRecord;

/// Records from one chunk, or why the chunk contributed nothing.
pub type ExtractionResult = Result<Vec<ReviewRecord>, ChunkFailure>;

pub const SYSTEM_PROMPT: &str = r#"You are a helpful assistant that extracts review details from web content.
Format the reviews like this in JSON:
{
    "reviews": [
        {
            "title": "Review Title",
            "body": "Review content",
            "rating": 5,
            "reviewer": "Reviewer Name"
        }
    ]
}
Respond with the JSON object only. If the content contains no reviews, respond with {"reviews": []}."#;

/// Longest slice of a bad response echoed into the logs.
const LOG_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct ReviewEnvelope {
    #[serde(default)]
    reviews: Option<Vec<Value>>,
}

/// Strip a surrounding markdown code fence (```` ```json ... ``` ````).
///
/// Anything that is not fully fenced comes back unchanged.
pub fn strip_code_fence(content: &str) -> &str {
    let content = content.trim();
    let Some(inner) = content
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return content;
    };
    // Drop the language tag on the opening line, if any.
    let inner = match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with(['{', '[']) => body,
        _ => inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    inner.trim()
}

/// Parse a raw model response into review records.
///
/// A missing or null `reviews` key means no reviews. Entries that are not
/// JSON objects are dropped one by one; the rest of the chunk survives.
pub fn parse_reviews(raw: &str) -> Result<Vec<ReviewRecord>, serde_json::Error> {
    let envelope: ReviewEnvelope = serde_json::from_str(strip_code_fence(raw))?;
    let records = envelope
        .reviews
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| match entry {
            Value::Object(fields) => Some(ReviewRecord::from(fields)),
            other => {
                warn!(position, "dropping review that is not an object: {}", other);
                None
            }
        })
        .collect();
    Ok(records)
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}

pub struct Extractor {
    client: Arc<dyn CompletionClient>,
    concurrency: NonZeroUsize,
}

impl Extractor {
    pub fn new(client: Arc<dyn CompletionClient>, concurrency: NonZeroUsize) -> Self {
        Self {
            client,
            concurrency,
        }
    }

    /// Extract reviews from a single chunk. Never panics on bad model output.
    pub async fn extract_chunk(&self, index: usize, chunk: &str) -> ExtractionResult {
        debug!(chunk = index, chars = chunk.chars().count(), "extracting reviews");
        let content = self
            .client
            .complete(SYSTEM_PROMPT, chunk)
            .await
            .map_err(|e| {
                warn!(chunk = index, "completion failed: {}", e);
                ChunkFailure::from(e)
            })?;

        match parse_reviews(&content) {
            Ok(records) => {
                debug!(chunk = index, records = records.len(), "chunk extracted");
                Ok(records)
            }
            Err(e) => {
                warn!(
                    chunk = index,
                    "error decoding JSON ({}): {}",
                    e,
                    preview(&content)
                );
                Err(ChunkFailure::Parse(e))
            }
        }
    }

    /// Extract every chunk, keeping results in chunk order.
    ///
    /// At most `concurrency` completion requests are in flight at once.
    pub async fn extract_all<'a, I>(&self, chunks: I) -> Vec<ExtractionResult>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pending: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| self.extract_chunk(index, chunk))
            .collect();
        stream::iter(pending)
            .buffered(self.concurrency.get())
            .collect()
            .await
    }
}
