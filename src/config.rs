//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sentipr.toml` files. The default configuration declares the three
//! sentiment models the tool ships with, each with its own vocabulary
//! scheme and truncation length.

use crate::analysis::normalize::VocabScheme;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GitHub source settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Inference endpoint settings.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Configured sentiment models.
    #[serde(default = "default_models", rename = "model")]
    pub models: Vec<ModelSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github: GithubConfig::default(),
            inference: InferenceConfig::default(),
            output: OutputConfig::default(),
            models: default_models(),
        }
    }
}

/// GitHub source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository owner (organization or user).
    #[serde(default)]
    pub owner: String,

    /// Repository name.
    #[serde(default)]
    pub repo: String,

    /// Maximum number of closed pull requests to fetch.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// GitHub REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            limit: default_limit(),
            api_url: default_api_url(),
        }
    }
}

fn default_limit() -> usize {
    100
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the model-serving API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File stem for the per-model CSV files.
    #[serde(default = "default_stem")]
    pub stem: String,

    /// Also write a single combined CSV with every model's rows.
    #[serde(default)]
    pub combined: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stem: default_stem(),
            combined: false,
        }
    }
}

fn default_stem() -> String {
    "sentiments".to_string()
}

/// One configured sentiment model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Short identifier used in CSV rows and file names.
    pub id: String,

    /// Hugging Face model repository, e.g.
    /// `cardiffnlp/twitter-roberta-base-sentiment-latest`.
    pub repo: String,

    /// How the model's label vocabulary maps onto the canonical taxonomy.
    #[serde(flatten)]
    pub vocab: VocabScheme,

    /// Maximum number of characters sent to the model. Varies per model
    /// family, so it is a per-model value rather than a global constant.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize {
    512
}

/// The three models the tool ships with by default.
fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            id: "roberta_latest".to_string(),
            repo: "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string(),
            vocab: VocabScheme::ThreeWay,
            max_chars: 512,
        },
        ModelSpec {
            id: "distilbert_sst2".to_string(),
            repo: "distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            vocab: VocabScheme::confidence_gated(),
            max_chars: 500,
        },
        ModelSpec {
            id: "bertweet".to_string(),
            repo: "finiteautomata/bertweet-base-sentiment-analysis".to_string(),
            vocab: VocabScheme::ThreeWay,
            max_chars: 500,
        },
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".sentipr.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref owner) = args.owner {
            self.github.owner = owner.clone();
        }
        if let Some(ref repo) = args.repo {
            self.github.repo = repo.clone();
        }
        if let Some(limit) = args.limit {
            self.github.limit = limit;
        }

        if let Some(timeout) = args.timeout {
            self.inference.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.output.stem = output.clone();
        }
        if args.combined {
            self.output.combined = true;
        }

        // A CLI threshold overrides every confidence-gated model.
        if let Some(threshold) = args.threshold {
            for spec in &mut self.models {
                if let VocabScheme::ConfidenceGated { threshold: t } = &mut spec.vocab {
                    *t = threshold;
                }
            }
        }

        // Restrict the run to the named models.
        if let Some(ref only) = args.models {
            self.models.retain(|spec| only.contains(&spec.id));
        }
    }

    /// Validate the merged configuration before a run.
    pub fn validate(&self) -> Result<()> {
        if self.github.owner.is_empty() || self.github.repo.is_empty() {
            anyhow::bail!("A repository owner and name are required (--owner/--repo)");
        }
        if self.github.limit == 0 {
            anyhow::bail!("Pull request limit must be at least 1");
        }
        if self.models.is_empty() {
            anyhow::bail!("No sentiment models configured (check --models against the config)");
        }
        for spec in &self.models {
            if spec.max_chars == 0 {
                anyhow::bail!("Model '{}' has max_chars = 0", spec.id);
            }
            if let VocabScheme::ConfidenceGated { threshold } = spec.vocab {
                if !(0.0..=1.0).contains(&threshold) {
                    anyhow::bail!(
                        "Model '{}' threshold must be between 0.0 and 1.0",
                        spec.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.limit, 100);
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.models[0].id, "roberta_latest");
        assert_eq!(
            config.models[1].vocab,
            VocabScheme::ConfidenceGated { threshold: 0.6 }
        );
        assert_eq!(config.models[1].max_chars, 500);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[github]
owner = "mediar-ai"
repo = "screenpipe"
limit = 50

[inference]
timeout_seconds = 10

[output]
stem = "pr_sentiments"
combined = true

[[model]]
id = "sst2"
repo = "distilbert-base-uncased-finetuned-sst-2-english"
scheme = "confidence-gated"
threshold = 0.7
max_chars = 500
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.github.owner, "mediar-ai");
        assert_eq!(config.github.limit, 50);
        assert_eq!(config.inference.timeout_seconds, 10);
        assert_eq!(config.output.stem, "pr_sentiments");
        assert!(config.output.combined);
        assert_eq!(config.models.len(), 1);
        assert_eq!(
            config.models[0].vocab,
            VocabScheme::ConfidenceGated { threshold: 0.7 }
        );
    }

    #[test]
    fn test_parse_three_way_model() {
        let toml_content = r#"
[[model]]
id = "roberta"
repo = "cardiffnlp/twitter-roberta-base-sentiment-latest"
scheme = "three-way"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.models[0].vocab, VocabScheme::ThreeWay);
        assert_eq!(config.models[0].max_chars, 512);
    }

    #[test]
    fn test_validate_requires_repo() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.github.owner = "mediar-ai".to_string();
        config.github.repo = "screenpipe".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.github.owner = "o".to_string();
        config.github.repo = "r".to_string();
        config.models[1].vocab = VocabScheme::ConfidenceGated { threshold: 1.5 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[inference]"));
        assert!(toml_str.contains("[[model]]"));
        assert!(toml_str.contains("three-way"));
    }
}
