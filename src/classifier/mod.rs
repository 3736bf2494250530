//! Sentiment classifiers.
//!
//! This module defines the `Classifier` seam the aggregator drives, plus the
//! production implementation backed by the Hugging Face Inference API. Model
//! loading and per-call classification fail independently: a load failure
//! excludes the model from the run, a classification failure only marks the
//! one item.

use crate::config::{InferenceConfig, ModelSpec};
use crate::models::RawClassification;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// A model could not be initialized. The whole model is excluded from the
/// run; no per-item rows are produced for it.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("cannot reach inference endpoint {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },
    #[error("model '{model}' rejected by inference endpoint ({status}): {body}")]
    Rejected {
        model: String,
        status: u16,
        body: String,
    },
}

/// A single classification call failed. Absorbed by the aggregator as an
/// ERROR row; never aborts the batch.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("cannot connect to inference endpoint: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("inference API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("no classification candidates in response")]
    EmptyResponse,
}

/// A pretrained text classifier invoked once per comment.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short identifier of the model, used in result rows.
    fn model_id(&self) -> &str;

    /// Classify one text, returning the model's raw label and score.
    async fn classify(&self, text: &str) -> Result<RawClassification, ClassifyError>;
}

/// One label candidate returned by the inference API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// Classifier backed by the Hugging Face Inference API.
pub struct HfClassifier {
    model_id: String,
    model_repo: String,
    url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl HfClassifier {
    /// Initialize a classifier for one configured model.
    ///
    /// Builds the HTTP client and probes the endpoint once so that a model
    /// that cannot be served is reported as a load failure up front instead
    /// of as a wall of per-item errors.
    pub async fn load(
        spec: &ModelSpec,
        inference: &InferenceConfig,
        api_token: Option<&str>,
    ) -> Result<Self, ModelLoadError> {
        info!("Loading model: {} ({})", spec.id, spec.repo);

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = api_token {
            let value = format!("Bearer {}", token)
                .parse()
                .map_err(|_| ModelLoadError::Client("invalid API token".to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(inference.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| ModelLoadError::Client(e.to_string()))?;

        let classifier = Self {
            model_id: spec.id.clone(),
            model_repo: spec.repo.clone(),
            url: format!("{}/models/{}", inference.endpoint, spec.repo),
            timeout_seconds: inference.timeout_seconds,
            http_client,
        };

        classifier.probe(&inference.endpoint).await?;
        info!("Model {} ready", classifier.model_id);

        Ok(classifier)
    }

    /// Warm-up request that distinguishes "endpoint down" from "model
    /// rejected" before the batch starts.
    async fn probe(&self, endpoint: &str) -> Result<(), ModelLoadError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&InferenceRequest { inputs: "ok" })
            .send()
            .await
            .map_err(|e| ModelLoadError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelLoadError::Rejected {
                model: self.model_repo.clone(),
                status: status.as_u16(),
                body,
            });
        }

        // 2xx means ready; 5xx (model still warming) is left for per-item
        // handling rather than failing the whole model.
        debug!("Probe for {} returned {}", self.model_id, status);
        Ok(())
    }
}

#[async_trait]
impl Classifier for HfClassifier {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn classify(&self, text: &str) -> Result<RawClassification, ClassifyError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&InferenceRequest { inputs: text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifyError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    ClassifyError::Connect(e.to_string())
                } else {
                    ClassifyError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Http(e.to_string()))?;

        let best = top_candidate(&value).ok_or(ClassifyError::EmptyResponse)?;

        Ok(RawClassification {
            label: best.label,
            score: best.score,
            model_id: self.model_id.clone(),
        })
    }
}

/// Picks the highest-scoring candidate from an inference response.
///
/// The API returns either `[[{label, score}, ...]]` (one inner list per
/// input) or a flat `[{label, score}, ...]`; both shapes are accepted.
pub fn top_candidate(value: &serde_json::Value) -> Option<Candidate> {
    let outer = value.as_array()?;
    let list = match outer.first() {
        Some(first) if first.is_array() => first.as_array()?,
        _ => outer,
    };

    list.iter()
        .filter_map(|v| serde_json::from_value::<Candidate>(v.clone()).ok())
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
