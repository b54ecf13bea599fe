//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tribunal.toml` files.

use crate::capability::{OllamaSettings, Timeouts, WikipediaSettings};
use crate::court::ResearchPolicy;
use crate::error::CourtError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tribunal.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Lookup settings.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Court settings.
    #[serde(default)]
    pub court: CourtConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory verdicts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("court_records")
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Generation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> u64 {
    300
}

/// Wikipedia lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// MediaWiki search API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Search results per lookup.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Lookup timeout in seconds.
    #[serde(default = "default_lookup_timeout")]
    pub timeout_seconds: u64,

    /// Lookups each advocate makes per round.
    #[serde(default = "default_lookups_per_round")]
    pub lookups_per_round: usize,

    /// Search keywords for the Admirer.
    #[serde(default = "default_positive_keywords")]
    pub positive_keywords: Vec<String>,

    /// Search keywords for the Critic.
    #[serde(default = "default_negative_keywords")]
    pub negative_keywords: Vec<String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_results: default_max_results(),
            timeout_seconds: default_lookup_timeout(),
            lookups_per_round: default_lookups_per_round(),
            positive_keywords: default_positive_keywords(),
            negative_keywords: default_negative_keywords(),
        }
    }
}

fn default_endpoint() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_max_results() -> usize {
    3
}

fn default_lookup_timeout() -> u64 {
    30
}

fn default_lookups_per_round() -> usize {
    1
}

fn default_positive_keywords() -> Vec<String> {
    ResearchPolicy::default().positive_keywords
}

fn default_negative_keywords() -> Vec<String> {
    ResearchPolicy::default().negative_keywords
}

/// Deliberation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtConfig {
    /// Round cap.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_max_rounds() -> u32 {
    3
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Language the verdict is written in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "English".to_string()
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
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref url) = args.wiki_url {
            self.lookup.endpoint = url.clone();
        }
        if let Some(timeout) = args.lookup_timeout {
            self.lookup.timeout_seconds = timeout;
        }
        if let Some(lookups) = args.lookups {
            self.lookup.lookups_per_round = lookups;
        }

        if let Some(max_rounds) = args.max_rounds {
            self.court.max_rounds = max_rounds;
        }

        if let Some(ref language) = args.language {
            self.report.language = language.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Reject settings the court cannot run with.
    pub fn validate(&self) -> Result<(), CourtError> {
        if self.court.max_rounds == 0 {
            return Err(CourtError::config("court.max_rounds must be at least 1"));
        }
        if self.lookup.lookups_per_round == 0 {
            return Err(CourtError::config("lookup.lookups_per_round must be at least 1"));
        }
        if self.lookup.max_results == 0 {
            return Err(CourtError::config("lookup.max_results must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            return Err(CourtError::config(
                "model.temperature must be between 0.0 and 1.0",
            ));
        }
        if self.report.language.trim().is_empty() {
            return Err(CourtError::config("report.language must not be empty"));
        }
        self.timeouts().validate()
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(self.model.timeout_seconds, self.lookup.timeout_seconds)
    }

    pub fn ollama_settings(&self) -> OllamaSettings {
        OllamaSettings {
            ollama_url: self.model.ollama_url.clone(),
            model_name: self.model.name.clone(),
            temperature: self.model.temperature,
        }
    }

    pub fn wikipedia_settings(&self) -> WikipediaSettings {
        WikipediaSettings {
            endpoint: self.lookup.endpoint.clone(),
            max_results: self.lookup.max_results,
        }
    }

    pub fn research_policy(&self) -> ResearchPolicy {
        ResearchPolicy {
            lookups_per_round: self.lookup.lookups_per_round,
            positive_keywords: self.lookup.positive_keywords.clone(),
            negative_keywords: self.lookup.negative_keywords.clone(),
        }
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
    use crate::cli::{Args, OutputFormat};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn make_args() -> Args {
        Args {
            inquiry: Some("Napoleon".to_string()),
            max_rounds: None,
            model: None,
            ollama_url: None,
            wiki_url: None,
            temperature: None,
            timeout: None,
            lookup_timeout: None,
            lookups: None,
            language: None,
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            verbose: false,
            quiet: false,
            strict: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "llama3.2:latest");
        assert_eq!(config.court.max_rounds, 3);
        assert_eq!(config.lookup.lookups_per_round, 1);
        assert_eq!(config.report.language, "English");
        assert_eq!(config.general.output_dir, PathBuf::from("court_records"));
        assert_ok!(config.validate());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output_dir = "verdicts"
verbose = true

[model]
name = "llama3.1:8b"
temperature = 0.2

[court]
max_rounds = 5

[report]
language = "Thai"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output_dir, PathBuf::from("verdicts"));
        assert!(config.general.verbose);
        assert_eq!(config.model.name, "llama3.1:8b");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.timeout_seconds, 300);
        assert_eq!(config.court.max_rounds, 5);
        assert_eq!(config.report.language, "Thai");
        assert_eq!(config.lookup.max_results, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[lookup]\nlookups_per_round = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.lookup.lookups_per_round, 2);
        assert_eq!(config.research_policy().lookups_per_round, 2);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[court\nmax_rounds = ").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_only_overrides_given_values() {
        let mut config: Config = toml::from_str("[model]\nname = \"from-file\"\n").unwrap();
        let mut args = make_args();
        args.max_rounds = Some(7);
        args.language = Some("Thai".to_string());

        config.merge_with_args(&args);

        assert_eq!(config.model.name, "from-file");
        assert_eq!(config.court.max_rounds, 7);
        assert_eq!(config.report.language, "Thai");

        args.model = Some("from-cli".to_string());
        config.merge_with_args(&args);
        assert_eq!(config.model.name, "from-cli");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.court.max_rounds = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.model.timeout_seconds = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.lookup.lookups_per_round = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.model.temperature = 1.5;
        assert_err!(config.validate());
    }

    #[test]
    fn test_derived_settings() {
        let config = Config::default();
        assert_eq!(config.timeouts().generation, Duration::from_secs(300));
        assert_eq!(config.timeouts().lookup, Duration::from_secs(30));
        assert_eq!(config.ollama_settings().model_name, "llama3.2:latest");
        assert_eq!(config.wikipedia_settings().max_results, 3);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[lookup]"));
        assert!(toml_str.contains("[court]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.court.max_rounds, 3);
    }
}
