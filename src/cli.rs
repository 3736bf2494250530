//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// sentipr - sentiment mining for GitHub pull-request comments
///
/// Fetches a repository's closed pull requests, runs one or more pretrained
/// sentiment models over their comments, and writes labeled CSV files with a
/// printed per-model distribution summary.
///
/// Examples:
///   sentipr --owner mediar-ai --repo screenpipe
///   sentipr --owner mediar-ai --repo screenpipe --models roberta_latest
///   sentipr --owner mediar-ai --repo screenpipe --limit 50 --combined
///   sentipr --owner mediar-ai --repo screenpipe --dry-run
///   sentipr --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Repository owner (organization or user)
    #[arg(short = 'o', long, value_name = "OWNER", required_unless_present = "init_config")]
    pub owner: Option<String>,

    /// Repository name
    #[arg(short = 'r', long, value_name = "REPO", required_unless_present = "init_config")]
    pub repo: Option<String>,

    /// Maximum number of closed pull requests to fetch
    #[arg(short, long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// GitHub API token (raises the unauthenticated rate limit)
    #[arg(long, env = "GITHUB_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Inference API token for gated or rate-limited models
    #[arg(long, env = "HF_API_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Output file stem; per-model files become <STEM>_<model>.csv
    #[arg(long, value_name = "STEM")]
    pub output: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sentipr.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Restrict the run to the named configured models (comma-separated)
    ///
    /// Example: --models roberta_latest,distilbert_sst2
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Confidence threshold override for two-way models (0.0 - 1.0)
    ///
    /// Binary calls below the threshold are forced to NEUTRAL
    #[arg(long, value_name = "SCORE")]
    pub threshold: Option<f64>,

    /// Per-request inference timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also write a combined CSV with every model's rows
    #[arg(long)]
    pub combined: bool,

    /// Fetch pull requests and comments without classifying anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .sentipr.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref owner) = self.owner {
            if owner.is_empty() {
                return Err("Repository owner must not be empty".to_string());
            }
        }
        if let Some(ref repo) = self.repo {
            if repo.is_empty() {
                return Err("Repository name must not be empty".to_string());
            }
        }

        if let Some(limit) = self.limit {
            if limit == 0 {
                return Err("Limit must be at least 1".to_string());
            }
        }

        if let Some(threshold) = self.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("Threshold must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
