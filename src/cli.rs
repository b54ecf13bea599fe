//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Tribunal - put any question on trial before a local AI court
///
/// An Admirer and a Critic research the inquiry in parallel, a judge decides
/// whether the evidence is balanced enough, and a scribe writes the verdict.
///
/// Examples:
///   tribunal "Was Napoleon a good leader?"
///   tribunal "Was Napoleon a good leader?" --max-rounds 5 --format json
///   tribunal "King Taksin" --language Thai --model llama3.1:8b
///   tribunal "Was Napoleon a good leader?" --dry-run
///   tribunal --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// The question or subject to put on trial
    #[arg(value_name = "INQUIRY", required_unless_present = "init_config")]
    pub inquiry: Option<String>,

    /// Maximum number of research rounds before the court adjourns
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<u32>,

    /// Ollama model used by every role
    ///
    /// Can also be set via TRIBUNAL_MODEL env var or .tribunal.toml config.
    #[arg(short, long, env = "TRIBUNAL_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// MediaWiki search API endpoint
    #[arg(long, value_name = "URL")]
    pub wiki_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Generation timeout in seconds, per call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Lookup timeout in seconds, per call
    #[arg(long, value_name = "SECS")]
    pub lookup_timeout: Option<u64>,

    /// Lookups each advocate makes per round
    #[arg(long, value_name = "COUNT")]
    pub lookups: Option<usize>,

    /// Language the verdict is written in
    #[arg(long)]
    pub language: Option<String>,

    /// Output file path for the report
    ///
    /// Defaults to <output_dir>/<inquiry>_verdict.<ext>
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tribunal.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when the court adjourns without a sufficient ruling
    #[arg(long)]
    pub strict: bool,

    /// Dry run: validate settings and print the round-1 search plan
    ///
    /// No model or lookup calls are made.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tribunal.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The trimmed inquiry, empty when not given (validate first).
    pub fn inquiry(&self) -> &str {
        self.inquiry.as_deref().map(str::trim).unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.inquiry().is_empty() {
            return Err("Inquiry must not be empty".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref url) = self.wiki_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Wiki URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.max_rounds == Some(0) {
            return Err("Max rounds must be at least 1".to_string());
        }

        if self.lookups == Some(0) {
            return Err("Lookups must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) || self.lookup_timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
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
