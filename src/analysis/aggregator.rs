//! Result aggregation.
//!
//! Drives the configured classifiers over a batch of comment items, one
//! model at a time, and accumulates normalized results. The aggregator is
//! stateless between batches: each run is a fresh fold over items x models.

use crate::analysis::normalize::{normalize_raw, VocabScheme};
use crate::classifier::Classifier;
use crate::models::{CommentItem, NormalizedResult, Sentiment, SummaryReport};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

/// Score reported for items with no text: certain absence of sentiment.
pub const BLANK_TEXT_SCORE: f64 = 1.0;

/// Score reported for items whose classification failed.
pub const ERROR_SCORE: f64 = 0.0;

/// A loaded classifier together with its normalization policy.
pub struct ConfiguredModel {
    /// The classifier to invoke per item.
    pub classifier: Box<dyn Classifier>,
    /// Vocabulary scheme for normalizing the model's raw output.
    pub scheme: VocabScheme,
    /// Maximum number of characters sent per invocation.
    pub max_chars: usize,
}

/// Accumulates normalized results for one batch run.
#[derive(Default)]
pub struct SentimentAggregator {
    results: Vec<NormalizedResult>,
}

impl SentimentAggregator {
    /// Creates an empty aggregator for a fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one model over the full item set, appending exactly one result
    /// per item.
    ///
    /// Blank items are recorded as neutral without invoking the classifier;
    /// a failed invocation is recorded as an ERROR row and the batch
    /// continues.
    pub async fn run_model(
        &mut self,
        model: &ConfiguredModel,
        items: &[CommentItem],
        show_progress: bool,
    ) -> usize {
        let model_id = model.classifier.model_id().to_string();
        info!("Classifying {} items with model {}", items.len(), model_id);

        let progress = progress_bar(items.len() as u64, &model_id, show_progress);
        let mut appended = 0;

        for item in items {
            let (sentiment, score) = if item.is_blank() {
                // No text to judge; the classifier is never invoked.
                (Sentiment::Neutral, BLANK_TEXT_SCORE)
            } else {
                let text = truncate_chars(&item.text, model.max_chars);
                match model.classifier.classify(text).await {
                    Ok(raw) => {
                        debug!(
                            "{}: PR #{} -> {} ({:.3})",
                            raw.model_id, item.pr_number, raw.label, raw.score
                        );
                        normalize_raw(&raw, model.scheme)
                    }
                    Err(e) => {
                        warn!("Classification failed for PR #{}: {}", item.pr_number, e);
                        (Sentiment::Error, ERROR_SCORE)
                    }
                }
            };

            self.results.push(NormalizedResult {
                pr_number: item.pr_number,
                pr_title: item.title().to_string(),
                comment: item.text.clone(),
                sentiment,
                score,
                model: model_id.clone(),
            });
            appended += 1;

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!("Model {} produced {} results", model_id, appended);
        appended
    }

    /// All accumulated results, across models, in emission order.
    pub fn results(&self) -> &[NormalizedResult] {
        &self.results
    }

    /// Results for one model, in emission order.
    pub fn results_for(&self, model_id: &str) -> Vec<NormalizedResult> {
        self.results
            .iter()
            .filter(|r| r.model == model_id)
            .cloned()
            .collect()
    }

    /// Percentage distribution of canonical labels for one model.
    pub fn summary(&self, model_id: &str) -> SummaryReport {
        SummaryReport::from_results(model_id, &self.results_for(model_id))
    }
}

/// Truncates to a character boundary; byte slicing would panic mid-codepoint
/// on non-ASCII comments.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn progress_bar(len: u64, model_id: &str, show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(model_id.to_string());
    Some(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifyError;
    use crate::models::RawClassification;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Test double that returns a fixed label, fails on request, and records
    /// every text it was invoked with.
    struct ScriptedClassifier {
        id: String,
        label: String,
        score: f64,
        fail_on: Option<String>,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedClassifier {
        fn new(id: &str, label: &str, score: f64) -> Self {
            Self {
                id: id.to_string(),
                label: label.to_string(),
                score,
                fail_on: None,
                calls: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing_on(mut self, text: &str) -> Self {
            self.fail_on = Some(text.to_string());
            self
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        fn model_id(&self) -> &str {
            &self.id
        }

        async fn classify(&self, text: &str) -> Result<RawClassification, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(text.to_string());

            if self.fail_on.as_deref() == Some(text) {
                return Err(ClassifyError::EmptyResponse);
            }

            Ok(RawClassification {
                label: self.label.clone(),
                score: self.score,
                model_id: self.id.clone(),
            })
        }
    }

    fn item(pr_number: u64, text: &str) -> CommentItem {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), format!("PR {}", pr_number));
        CommentItem::new(pr_number, text.to_string(), metadata)
    }

    fn configured(classifier: ScriptedClassifier, scheme: VocabScheme) -> ConfiguredModel {
        ConfiguredModel {
            classifier: Box::new(classifier),
            scheme,
            max_chars: 512,
        }
    }

    #[tokio::test]
    async fn test_blank_items_skip_the_classifier() {
        let classifier = ScriptedClassifier::new("m", "POSITIVE", 0.9);
        let calls = classifier.calls.clone();
        let model = configured(classifier, VocabScheme::ThreeWay);

        let items = vec![item(1, ""), item(2, "   \n")];
        let mut aggregator = SentimentAggregator::new();
        aggregator.run_model(&model, &items, false).await;

        let results = aggregator.results();
        assert_eq!(results.len(), 2);
        for result in results {
            assert_eq!(result.sentiment, Sentiment::Neutral);
            assert_eq!(result.score, BLANK_TEXT_SCORE);
        }

        // The classifier was never invoked for blank text.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_batch() {
        let classifier =
            ScriptedClassifier::new("m", "POSITIVE", 0.9).failing_on("this one breaks");
        let model = configured(classifier, VocabScheme::ThreeWay);

        let mut items: Vec<CommentItem> = (0..99).map(|i| item(i, "looks good")).collect();
        items.push(item(99, "this one breaks"));

        let mut aggregator = SentimentAggregator::new();
        let appended = aggregator.run_model(&model, &items, false).await;
        assert_eq!(appended, 100);

        let errors: Vec<_> = aggregator
            .results()
            .iter()
            .filter(|r| r.sentiment == Sentiment::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pr_number, 99);
        assert_eq!(errors[0].score, ERROR_SCORE);

        let ok = aggregator
            .results()
            .iter()
            .filter(|r| r.sentiment == Sentiment::Positive)
            .count();
        assert_eq!(ok, 99);
    }

    #[tokio::test]
    async fn test_multiple_models_over_the_same_items() {
        let three_way = configured(
            ScriptedClassifier::new("roberta", "LABEL_2", 0.9),
            VocabScheme::ThreeWay,
        );
        let gated = configured(
            ScriptedClassifier::new("sst2", "POSITIVE", 0.55).failing_on("broken"),
            VocabScheme::confidence_gated(),
        );

        let items = vec![item(1, "great work"), item(2, "broken")];
        let mut aggregator = SentimentAggregator::new();
        aggregator.run_model(&three_way, &items, false).await;
        aggregator.run_model(&gated, &items, false).await;

        // One row per (item, model).
        assert_eq!(aggregator.results().len(), 4);

        let roberta = aggregator.results_for("roberta");
        assert!(roberta.iter().all(|r| r.sentiment == Sentiment::Positive));

        // The gated model's failure does not leak into the other model.
        let sst2 = aggregator.results_for("sst2");
        assert_eq!(sst2[0].sentiment, Sentiment::Neutral); // 0.55 < 0.6 gate
        assert!((sst2[0].score - 0.45).abs() < 1e-9);
        assert_eq!(sst2[1].sentiment, Sentiment::Error);
    }

    #[tokio::test]
    async fn test_text_is_truncated_per_model() {
        let classifier = ScriptedClassifier::new("m", "NEU", 0.8);
        let seen = classifier.seen.clone();
        let model = ConfiguredModel {
            classifier: Box::new(classifier),
            scheme: VocabScheme::ThreeWay,
            max_chars: 10,
        };

        let long = "é".repeat(40);
        let items = vec![item(1, &long)];
        let mut aggregator = SentimentAggregator::new();
        aggregator.run_model(&model, &items, false).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].chars().count(), 10);

        // The full comment still lands in the result row.
        assert_eq!(aggregator.results()[0].comment.chars().count(), 40);
    }

    #[tokio::test]
    async fn test_summary_through_aggregator() {
        let model = configured(
            ScriptedClassifier::new("m", "LABEL_0", 0.8),
            VocabScheme::ThreeWay,
        );

        let items = vec![item(1, "bad"), item(2, "awful"), item(3, "")];
        let mut aggregator = SentimentAggregator::new();
        aggregator.run_model(&model, &items, false).await;

        let summary = aggregator.summary("m");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.percentages.get(&Sentiment::Negative), Some(&66.67));
        assert_eq!(summary.percentages.get(&Sentiment::Neutral), Some(&33.33));

        // Unknown model id yields an empty summary, not a panic.
        let empty = aggregator.summary("nope");
        assert_eq!(empty.total, 0);
        assert!(empty.percentages.is_empty());
    }

    #[test]
    fn test_truncate_chars_is_boundary_safe() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 5), "");
    }
}
