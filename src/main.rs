//! Tribunal - a local AI court for open questions
//!
//! A CLI tool that puts an inquiry on trial: an Admirer and a Critic research
//! it in parallel, a judge rules on whether the evidence is balanced, and a
//! scribe writes the final verdict to the court records.
//!
//! Exit codes:
//!   0 - Verdict written
//!   1 - Runtime error (configuration, connection, failed deliberation, etc.)
//!   2 - Court adjourned on the round cap and --strict was set

mod analysis;
mod capability;
mod cli;
mod config;
mod court;
mod error;
mod models;
mod report;

use anyhow::{Context, Result};
use capability::{Capabilities, OllamaGenerator, WikipediaLookup};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use court::{Brief, DeliberationController};
use error::CourtError;
use indicatif::{ProgressBar, ProgressStyle};
use models::{CourtReport, Feedback, ReportMetadata, Stance, TerminationReason};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

    // Load configuration before logging so the file can turn on verbose output
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, config.general.verbose);

    info!("Tribunal v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_trial(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Trial failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tribunal.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, lookups, round cap, and language.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = if config_verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

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

/// Run the complete trial workflow. Returns exit code (0 or 2).
async fn run_trial(args: Args, mut config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.merge_with_args(&args);
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let inquiry = args.inquiry().to_string();

    if args.dry_run {
        return handle_dry_run(&config, &inquiry);
    }

    // Step 1: Wire up the capabilities
    println!("⚖️  Convening the court on: {}", inquiry);
    println!("   Model: {}", config.model.name);
    println!("   Ollama: {}", config.model.ollama_url);
    println!("   Lookups: {}", config.lookup.endpoint);
    println!("   Max rounds: {}", config.court.max_rounds);
    println!("   Verdict language: {}", config.report.language);

    let generator = OllamaGenerator::new(config.ollama_settings())?;
    let lookup = WikipediaLookup::new(config.wikipedia_settings())?;
    let capabilities = Capabilities::new(Arc::new(generator), Arc::new(lookup));
    let model_used = capabilities.model_name().to_string();

    let controller = DeliberationController::from_capabilities(
        capabilities,
        config.research_policy(),
        &config.report.language,
    );

    // Step 2: Deliberate
    println!("\n🏛️  The court is in session...\n");
    let spinner = (!args.quiet).then(new_spinner);

    let outcome = controller
        .run(&inquiry, config.court.max_rounds, &config.timeouts())
        .await;

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    let deliberation = match outcome {
        Ok(deliberation) => deliberation,
        Err(e) => {
            if let CourtError::Failure { transcript, .. } = &e {
                warn!(
                    "{} round(s) completed before the failure",
                    transcript.len()
                );
            }
            return Err(e.into());
        }
    };

    // Step 3: Build the report
    println!("📝 Recording the verdict...");

    let duration = start_time.elapsed().as_secs_f64();
    let summary = analysis::summarize(&deliberation.transcript);

    let metadata = ReportMetadata {
        inquiry: deliberation.inquiry.clone(),
        report_date: Utc::now(),
        model_used,
        rounds_held: deliberation.rounds_held(),
        max_rounds: config.court.max_rounds,
        termination: deliberation.reason,
        duration_seconds: duration,
    };

    let report = CourtReport {
        metadata,
        summary,
        artifact: deliberation.artifact,
        transcript: deliberation.transcript,
    };

    // Step 4: Save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = args.output.clone().unwrap_or_else(|| {
        report::default_output_path(
            &config.general.output_dir,
            &report.metadata.inquiry,
            args.format.extension(),
        )
    });
    report::write_report(&output, &output_path)?;

    // Print summary
    println!("\n📊 Deliberation Summary:");
    for line in analysis::generate_summary_text(&report.summary).lines() {
        println!("   {}", line);
    }
    println!("   Adjourned: {}", report.metadata.termination);
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Verdict recorded! Saved to: {}",
        output_path.display()
    );

    if args.strict && report.metadata.termination == TerminationReason::MaxRoundsReached {
        eprintln!(
            "\n⛔ The judge never ruled the evidence sufficient. Failing (exit code 2)."
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: print the round-1 search plan for both advocates, exit.
fn handle_dry_run(config: &Config, inquiry: &str) -> Result<i32> {
    println!("\n🔍 Dry run: planning round 1 (no model or lookup calls)...\n");

    let policy = config.research_policy();
    let feedback = Feedback::default();

    for stance in Stance::BOTH {
        let brief = Brief {
            stance,
            round: 1,
            inquiry,
            feedback: &feedback,
        };
        println!("   {} {} would search:", stance.emoji(), stance.advocate());
        for query in policy.queries(&brief) {
            println!("     🔎 {}", query);
        }
    }

    println!(
        "\n   Up to {} round(s) with model {}",
        config.court.max_rounds, config.model.name
    );
    println!("\n✅ Dry run complete. No model calls were made.");
    Ok(0)
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Advocates researching, judge deliberating...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Load configuration from file or use defaults.
///
/// Runs before the subscriber is installed, so problems go to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
