//! Sentiment analysis core.
//!
//! Label normalization and per-batch result aggregation.

pub mod aggregator;
pub mod normalize;

pub use aggregator::{ConfiguredModel, SentimentAggregator};
pub use normalize::{normalize, VocabScheme};
