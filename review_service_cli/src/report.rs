//! Review records and the aggregate report returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::extract::ExtractionResult;

/// One review as emitted by the model.
///
/// Absent fields stay absent, `rating` is passed through without range or
/// type checks (an explicit `null` included), and any extra keys the model
/// adds are kept. A `title`, `body` or `reviewer` that is not a string is
/// kept verbatim in `extra` under its own key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(from = "Map<String, Value>")]
pub struct ReviewRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

impl From<Map<String, Value>> for ReviewRecord {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            title: take_string(&mut fields, "title"),
            body: take_string(&mut fields, "body"),
            rating: fields.remove("rating"),
            reviewer: take_string(&mut fields, "reviewer"),
            extra: fields,
        }
    }
}

/// All reviews found on a page, in chunk order.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct AggregateReport {
    reviews_count: usize,
    reviews: Vec<ReviewRecord>,
}

impl AggregateReport {
    /// Concatenate per-chunk results in order, dropping failed chunks.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = ExtractionResult>,
    {
        let mut reviews = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(mut records) => reviews.append(&mut records),
                Err(failure) => warn!(chunk = index, "skipping chunk: {}", failure),
            }
        }
        Self::from_reviews(reviews)
    }

    pub fn from_reviews(reviews: Vec<ReviewRecord>) -> Self {
        Self {
            reviews_count: reviews.len(),
            reviews,
        }
    }

    pub fn reviews_count(&self) -> usize {
        self.reviews_count
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        &self.reviews
    }

    pub fn into_reviews(self) -> Vec<ReviewRecord> {
        self.reviews
    }
}
