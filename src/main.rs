//! sentipr - sentiment mining for GitHub pull-request comments
//!
//! A CLI tool that fetches a repository's closed pull requests, runs
//! pretrained sentiment models over their comments, and writes labeled
//! CSV files with a printed distribution summary per model.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (fetch failure, config error, etc.)
//!   2 - Every configured model failed to load

mod analysis;
mod classifier;
mod cli;
mod config;
mod github;
mod models;
mod report;

use analysis::{ConfiguredModel, SentimentAggregator};
use anyhow::{Context, Result};
use classifier::HfClassifier;
use cli::Args;
use config::Config;
use github::GithubClient;
use models::RunReport;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("sentipr v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the analysis
    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sentipr.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".sentipr.toml");

    if path.exists() {
        eprintln!("⚠️  .sentipr.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .sentipr.toml")?;

    println!("✅ Created .sentipr.toml with default settings.");
    println!("   Edit it to customize the repository, models, and thresholds.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let owner = config.github.owner.clone();
    let repo = config.github.repo.clone();
    let show_progress = !args.quiet;

    let mut run_report = RunReport::new();

    // Step 1: Fetch closed pull requests and their comments
    println!("🔍 Fetching closed pull requests for {}/{}...", owner, repo);
    let client = GithubClient::new(&config.github.api_url, args.token.as_deref())?;

    let prs = client
        .closed_pull_requests(&owner, &repo, config.github.limit)
        .await?;
    println!("✅ {} pull requests collected.", prs.len());

    let items = client
        .comment_items(&owner, &repo, &prs, show_progress)
        .await?;
    println!("✅ {} comment items collected.", items.len());

    run_report.pull_requests = prs.len();
    run_report.comments = items.len();

    // Handle --dry-run: fetch only, no classification
    if args.dry_run {
        println!("\n✅ Dry run complete. No classification was performed.");
        return Ok(0);
    }

    // Step 2: Load the configured models
    println!("\n🧠 Loading {} sentiment model(s)...", config.models.len());
    let mut loaded: Vec<ConfiguredModel> = Vec::new();

    for spec in &config.models {
        match HfClassifier::load(spec, &config.inference, args.hf_token.as_deref()).await {
            Ok(classifier) => {
                println!("   ✅ {} ({})", spec.id, spec.repo);
                run_report.loaded_models.push(spec.id.clone());
                loaded.push(ConfiguredModel {
                    classifier: Box::new(classifier),
                    scheme: spec.vocab,
                    max_chars: spec.max_chars,
                });
            }
            Err(e) => {
                warn!("Model {} failed to load: {}", spec.id, e);
                println!("   ⚠️  {} skipped: {}", spec.id, e);
                run_report.record_load_failure(&spec.id, &e.to_string());
            }
        }
    }

    if run_report.all_models_failed() {
        run_report.duration_seconds = start_time.elapsed().as_secs_f64();
        report::print_summary(&[], &run_report);
        eprintln!("\n⛔ Every configured model failed to load. Failing (exit code 2).");
        return Ok(2);
    }

    // Step 3: Classify all comments with each model
    println!("\n🔬 Classifying comments...");
    let mut aggregator = SentimentAggregator::new();
    for model in &loaded {
        aggregator.run_model(model, &items, show_progress).await;
    }

    // Step 4: Write the CSV files
    println!("\n📝 Writing results...");
    for model_id in &run_report.loaded_models {
        let path = report::model_csv_path(&config.output.stem, model_id);
        report::write_csv(&path, &aggregator.results_for(model_id))?;
        println!("   📁 {}", path.display());
    }
    if config.output.combined {
        let path = report::combined_csv_path(&config.output.stem);
        report::write_csv(&path, aggregator.results())?;
        println!("   📁 {}", path.display());
    }

    // Step 5: Print the per-model summaries
    run_report.duration_seconds = start_time.elapsed().as_secs_f64();
    let summaries: Vec<_> = run_report
        .loaded_models
        .iter()
        .map(|model_id| aggregator.summary(model_id))
        .collect();
    report::print_summary(&summaries, &run_report);

    println!("\n✅ Done.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .sentipr.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
