//! Data models for the sentiment pipeline.
//!
//! This module contains the core data structures used throughout the
//! application: fetched comments, raw and normalized classifications,
//! and the per-model summary reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical sentiment category every model vocabulary is normalized into.
///
/// `Error` marks a failed classification attempt for an item and is distinct
/// from a neutral judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    /// Positive sentiment.
    Positive,
    /// Negative sentiment.
    Negative,
    /// No strong sentiment, or no text to classify.
    Neutral,
    /// Classification failed for this item.
    Error,
}

impl Sentiment {
    /// Stable string form used in CSV rows and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::Error => "ERROR",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single comment fetched from a pull request.
///
/// Immutable once fetched. A pull request with no comments at all is
/// represented by one blank-text item so it is never silently dropped
/// downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentItem {
    /// Pull request number the comment belongs to.
    pub pr_number: u64,
    /// Raw comment body. Empty for the no-comments placeholder.
    pub text: String,
    /// Open string-to-string metadata: title, author, comment_type, created_at.
    pub metadata: BTreeMap<String, String>,
}

impl CommentItem {
    /// Creates a comment item with the given metadata.
    pub fn new(pr_number: u64, text: String, metadata: BTreeMap<String, String>) -> Self {
        Self {
            pr_number,
            text,
            metadata,
        }
    }

    /// Creates the placeholder item for a pull request with no comments.
    pub fn without_comments(pr_number: u64, title: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), title.to_string());
        metadata.insert("comment_type".to_string(), "none".to_string());
        Self {
            pr_number,
            text: String::new(),
            metadata,
        }
    }

    /// Whether the comment body is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Pull request title, if the source recorded one.
    pub fn title(&self) -> &str {
        self.metadata.get("title").map(String::as_str).unwrap_or("")
    }
}

/// Direct output of one classifier invocation, before normalization.
///
/// Ephemeral: consumed immediately by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassification {
    /// Model-specific label, e.g. "LABEL_2" or "positive".
    pub label: String,
    /// Confidence score in [0, 1].
    pub score: f64,
    /// Identifier of the model that produced the label.
    pub model_id: String,
}

/// One normalized classification for a (comment, model) pair.
///
/// Serializes directly to a CSV row; field order is the column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Pull request number.
    pub pr_number: u64,
    /// Pull request title.
    pub pr_title: String,
    /// Comment body the classification applies to.
    pub comment: String,
    /// Canonical sentiment label.
    pub sentiment: Sentiment,
    /// Canonical confidence score.
    pub score: f64,
    /// Identifier of the model that produced the row.
    pub model: String,
}

/// Percentage distribution of canonical labels for one model's results.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    /// Model the distribution belongs to.
    pub model_id: String,
    /// Number of results the percentages were computed over.
    pub total: usize,
    /// Label percentage, rounded to two decimal places. Empty when there
    /// are no results.
    pub percentages: BTreeMap<Sentiment, f64>,
}

impl SummaryReport {
    /// Computes the label distribution over a model's results.
    ///
    /// Percentages sum to ~100 for nonempty input; the map is empty when
    /// `results` is empty.
    pub fn from_results(model_id: &str, results: &[NormalizedResult]) -> Self {
        let mut counts: BTreeMap<Sentiment, usize> = BTreeMap::new();
        for result in results {
            *counts.entry(result.sentiment).or_insert(0) += 1;
        }

        let total = results.len();
        let percentages = counts
            .into_iter()
            .map(|(sentiment, count)| {
                let pct = (count as f64 / total as f64) * 100.0;
                (sentiment, (pct * 100.0).round() / 100.0)
            })
            .collect();

        Self {
            model_id: model_id.to_string(),
            total,
            percentages,
        }
    }
}

/// Bookkeeping for one batch run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Models that loaded and produced results.
    pub loaded_models: Vec<String>,
    /// Models that failed to initialize, with the failure text. These
    /// produce no per-item rows.
    pub failed_models: Vec<(String, String)>,
    /// Number of pull requests fetched.
    pub pull_requests: usize,
    /// Number of comment items classified per model.
    pub comments: usize,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

impl RunReport {
    /// Creates an empty report stamped with the current time.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            loaded_models: Vec::new(),
            failed_models: Vec::new(),
            pull_requests: 0,
            comments: 0,
            duration_seconds: 0.0,
        }
    }

    /// Records a model that could not be initialized.
    pub fn record_load_failure(&mut self, model_id: &str, error: &str) {
        self.failed_models
            .push((model_id.to_string(), error.to_string()));
    }

    /// True when no configured model survived loading.
    pub fn all_models_failed(&self) -> bool {
        self.loaded_models.is_empty() && !self.failed_models.is_empty()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
