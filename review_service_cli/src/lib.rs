pub mod ai;
pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod html;
pub mod pipeline;
pub mod renderer;
pub mod report;
pub mod utils;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::PipelineError;
pub use pipeline::ReviewPipeline;
pub use report::{AggregateReport, ReviewRecord};

/// A single page to extract reviews from.
///
/// Only emptiness is checked here; a malformed URL surfaces later as a
/// render failure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageRequest {
    url: String,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Result<Self, PipelineError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "page url must not be empty".to_string(),
            ));
        }
        Ok(Self {
            url: trimmed.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// HTML snapshot of a page after client-side scripts ran.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    html: String,
    captured_at: DateTime<Utc>,
}

impl RenderedDocument {
    pub fn new(html: String) -> Self {
        Self {
            html,
            captured_at: Utc::now(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn into_html(self) -> String {
        self.html
    }

    pub fn content_length(&self) -> usize {
        self.html.len()
    }
}
