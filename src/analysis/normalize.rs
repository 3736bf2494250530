//! Label normalization.
//!
//! Each configured model declares a vocabulary scheme describing how its raw
//! label/score output maps onto the canonical sentiment taxonomy. A single
//! pure function consumes the scheme, so per-model mapping rules live in
//! configuration instead of scattered conditionals.

use crate::models::{RawClassification, Sentiment};
use serde::{Deserialize, Serialize};

/// Fallback score for labels no scheme recognizes.
pub const UNRECOGNIZED_SCORE: f64 = 0.5;

/// Default confidence threshold for two-way models.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// How a model's raw output vocabulary is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "kebab-case")]
pub enum VocabScheme {
    /// The model emits three-way labels (or LABEL_0/1/2 indices); map them
    /// directly by keyword.
    ThreeWay,
    /// The model only emits POSITIVE/NEGATIVE. Calls below the threshold
    /// are forced to neutral with the score inverted to 1 - score.
    ConfidenceGated {
        /// Minimum score for a binary call to keep its label.
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl VocabScheme {
    /// A confidence-gated scheme with the default 0.6 threshold.
    pub fn confidence_gated() -> Self {
        VocabScheme::ConfidenceGated {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Maps a raw model label and score onto the canonical taxonomy.
///
/// Pure and total: malformed or unknown labels degrade to
/// (`Neutral`, 0.5) instead of failing.
///
/// Order matters and differs by scheme: confidence-gated schemes apply the
/// threshold check before looking at label content, three-way schemes match
/// label content first.
pub fn normalize(label: &str, score: f64, scheme: VocabScheme) -> (Sentiment, f64) {
    let label = label.to_uppercase();

    match scheme {
        VocabScheme::ThreeWay => {
            if label.contains("POS") || label == "LABEL_2" {
                (Sentiment::Positive, score)
            } else if label.contains("NEG") || label == "LABEL_0" {
                (Sentiment::Negative, score)
            } else if label.contains("NEU") || label == "LABEL_1" {
                (Sentiment::Neutral, score)
            } else {
                (Sentiment::Neutral, UNRECOGNIZED_SCORE)
            }
        }
        VocabScheme::ConfidenceGated { threshold } => {
            // A low-confidence binary call is "no strong sentiment"; the
            // reported score becomes the confidence of neutrality.
            if score < threshold {
                return (Sentiment::Neutral, 1.0 - score);
            }

            if label.contains("POSITIVE") {
                (Sentiment::Positive, score)
            } else if label.contains("NEGATIVE") {
                (Sentiment::Negative, score)
            } else {
                (Sentiment::Neutral, UNRECOGNIZED_SCORE)
            }
        }
    }
}

/// Convenience wrapper over [`normalize`] for a full raw classification.
pub fn normalize_raw(raw: &RawClassification, scheme: VocabScheme) -> (Sentiment, f64) {
    normalize(&raw.label, raw.score, scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_way_keyword_labels() {
        assert_eq!(
            normalize("positive", 0.8, VocabScheme::ThreeWay),
            (Sentiment::Positive, 0.8)
        );
        assert_eq!(
            normalize("NEG", 0.7, VocabScheme::ThreeWay),
            (Sentiment::Negative, 0.7)
        );
        assert_eq!(
            normalize("neutral", 0.6, VocabScheme::ThreeWay),
            (Sentiment::Neutral, 0.6)
        );
    }

    #[test]
    fn test_three_way_indexed_labels() {
        assert_eq!(
            normalize("LABEL_0", 0.91, VocabScheme::ThreeWay),
            (Sentiment::Negative, 0.91)
        );
        assert_eq!(
            normalize("LABEL_1", 0.44, VocabScheme::ThreeWay),
            (Sentiment::Neutral, 0.44)
        );
        assert_eq!(
            normalize("LABEL_2", 0.99, VocabScheme::ThreeWay),
            (Sentiment::Positive, 0.99)
        );
    }

    #[test]
    fn test_three_way_unrecognized_label_defaults() {
        assert_eq!(
            normalize("FOO", 0.97, VocabScheme::ThreeWay),
            (Sentiment::Neutral, UNRECOGNIZED_SCORE)
        );
    }

    #[test]
    fn test_confidence_gate_below_threshold() {
        let (sentiment, score) = normalize("POSITIVE", 0.55, VocabScheme::confidence_gated());
        assert_eq!(sentiment, Sentiment::Neutral);
        assert!((score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_gate_above_threshold() {
        assert_eq!(
            normalize("POSITIVE", 0.9, VocabScheme::confidence_gated()),
            (Sentiment::Positive, 0.9)
        );
        assert_eq!(
            normalize("NEGATIVE", 0.61, VocabScheme::confidence_gated()),
            (Sentiment::Negative, 0.61)
        );
    }

    #[test]
    fn test_confidence_gate_checks_threshold_before_label() {
        // Even a garbage label is gated to neutral first when the score is
        // below the threshold.
        let (sentiment, score) = normalize("FOO", 0.2, VocabScheme::confidence_gated());
        assert_eq!(sentiment, Sentiment::Neutral);
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_gate_custom_threshold() {
        let scheme = VocabScheme::ConfidenceGated { threshold: 0.8 };
        let (sentiment, _) = normalize("POSITIVE", 0.75, scheme);
        assert_eq!(sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_confidence_gate_unrecognized_label_above_threshold() {
        assert_eq!(
            normalize("FOO", 0.95, VocabScheme::confidence_gated()),
            (Sentiment::Neutral, UNRECOGNIZED_SCORE)
        );
    }

    #[test]
    fn test_normalize_is_pure() {
        let raw = RawClassification {
            label: "LABEL_2".to_string(),
            score: 0.87,
            model_id: "roberta".to_string(),
        };

        let first = normalize_raw(&raw, VocabScheme::ThreeWay);
        let second = normalize_raw(&raw, VocabScheme::ThreeWay);
        assert_eq!(first, second);
        assert_eq!(first, (Sentiment::Positive, 0.87));
    }

    #[test]
    fn test_case_insensitive_matching() {
        assert_eq!(
            normalize("PoSiTiVe", 0.9, VocabScheme::ThreeWay).0,
            Sentiment::Positive
        );
        assert_eq!(
            normalize("negative", 0.9, VocabScheme::confidence_gated()).0,
            Sentiment::Negative
        );
    }

    #[test]
    fn test_scheme_toml_roundtrip() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Wrapper {
            #[serde(flatten)]
            vocab: VocabScheme,
        }

        let parsed: Wrapper = toml::from_str("scheme = \"three-way\"").unwrap();
        assert_eq!(parsed.vocab, VocabScheme::ThreeWay);

        let parsed: Wrapper =
            toml::from_str("scheme = \"confidence-gated\"\nthreshold = 0.7").unwrap();
        assert_eq!(
            parsed.vocab,
            VocabScheme::ConfidenceGated { threshold: 0.7 }
        );
    }
}
