//! Court report generation.
//!
//! This module renders the court report as Markdown or JSON and writes it
//! to the court records directory.

use crate::analysis::most_cited_queries;
use crate::models::{CourtReport, DeliberationSummary, ReportMetadata, Stance, TerminationReason};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &CourtReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Tribunal Verdict\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(report));

    // Verdict body, already written by the scribe
    output.push_str("## Verdict\n\n");
    output.push_str(report.artifact.text().trim());
    output.push_str("\n\n");

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Inquiry:** {}\n", metadata.inquiry));
    section.push_str(&format!(
        "- **Date:** {}\n",
        metadata.report_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Rounds Held:** {} of {}\n",
        metadata.rounds_held, metadata.max_rounds
    ));
    section.push_str(&format!(
        "- **Adjourned:** {}\n",
        termination_badge(metadata.termination)
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn termination_badge(reason: TerminationReason) -> String {
    match reason {
        TerminationReason::SufficientInfo => format!("✅ {}", reason),
        TerminationReason::MaxRoundsReached => {
            format!("⚠️ {} (the judge never ruled the evidence sufficient)", reason)
        }
        TerminationReason::Failure => format!("❌ {}", reason),
    }
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &CourtReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Verdict](#verdict)\n");
    for round in report.transcript.rounds() {
        toc.push_str(&format!("  - [Round {}](#round-{})\n", round.round, round.round));
    }
    toc.push('\n');

    toc
}

/// Generate the summary section.
fn generate_summary_section(report: &CourtReport) -> String {
    let summary: &DeliberationSummary = &report.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    section.push_str("### Evidence by Side\n\n");
    section.push_str("| Side | Citations | Avg. Statement Length |\n");
    section.push_str("|:---|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} {} | {} | {} chars |\n",
        Stance::Positive.emoji(),
        Stance::Positive.advocate(),
        summary.positive_citations,
        summary.positive_mean_length
    ));
    section.push_str(&format!(
        "| {} {} | {} | {} chars |\n\n",
        Stance::Negative.emoji(),
        Stance::Negative.advocate(),
        summary.negative_citations,
        summary.negative_mean_length
    ));

    if !summary.feedback_chain.is_empty() {
        section.push_str("### Judge's Requests\n\n");
        section.push_str("| After Round | Request |\n");
        section.push_str("|:---:|:---|\n");
        for (round, feedback) in &summary.feedback_chain {
            section.push_str(&format!("| {} | {} |\n", round, feedback.replace('|', "\\|")));
        }
        section.push('\n');
    }

    let queries = most_cited_queries(&report.transcript, 5);
    if !queries.is_empty() {
        section.push_str("### Most Cited Searches\n\n");
        section.push_str("| Search | Citations |\n");
        section.push_str("|:---|:---:|\n");
        for (query, count) in queries {
            section.push_str(&format!("| `{}` | {} |\n", query, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Tribunal*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &CourtReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// File name for an inquiry's verdict, e.g. `Was_X_a_tyrant_verdict.md`.
///
/// Whitespace becomes `_`; path separators, dots, control characters and
/// characters Windows rejects are dropped. Other scripts pass through.
pub fn verdict_filename(inquiry: &str, extension: &str) -> String {
    const UNSAFE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '.'];

    let slug: String = inquiry
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_control() || UNSAFE.contains(&c) => None,
            c => Some(c),
        })
        .collect();

    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "inquiry" } else { slug };

    format!("{}_verdict.{}", slug, extension)
}

/// Default report location inside the court records directory.
pub fn default_output_path(output_dir: &Path, inquiry: &str, extension: &str) -> PathBuf {
    output_dir.join(verdict_filename(inquiry, extension))
}

/// Write report content, creating parent directories as needed.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summarize;
    use crate::models::{
        Feedback, FinalArtifact, PositionStatement, Snippet, Transcript, Verdict,
    };
    use chrono::Utc;

    fn create_test_report() -> CourtReport {
        let mut transcript = Transcript::new();
        transcript
            .open_round(
                PositionStatement {
                    stance: Stance::Positive,
                    round: 1,
                    text: "Unified the country".to_string(),
                    snippets: vec![Snippet {
                        query: "X achievements".to_string(),
                        text: "X unified the country".to_string(),
                    }],
                },
                PositionStatement {
                    stance: Stance::Negative,
                    round: 1,
                    text: "Suppressed dissent".to_string(),
                    snippets: vec![],
                },
            )
            .unwrap();
        transcript
            .settle_round(Verdict::insufficient(
                Feedback::new("Critic, cite sources"),
                "unbalanced",
            ))
            .unwrap();

        let summary = summarize(&transcript);

        CourtReport {
            metadata: ReportMetadata {
                inquiry: "Was X a tyrant?".to_string(),
                report_date: Utc::now(),
                model_used: "test-model".to_string(),
                rounds_held: 1,
                max_rounds: 1,
                termination: TerminationReason::MaxRoundsReached,
                duration_seconds: 12.5,
            },
            summary,
            artifact: FinalArtifact::new("Introduction\n\nA mixed legacy."),
            transcript,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Tribunal Verdict"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Verdict"));
        assert!(markdown.contains("A mixed legacy."));
        assert!(markdown.contains("Was X a tyrant?"));
        assert!(markdown.contains("Maximum rounds reached"));
        assert!(markdown.contains("Critic, cite sources"));
        assert!(markdown.contains("`X achievements`"));
        assert!(markdown.contains("[Round 1](#round-1)"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("test-model"));
        assert!(section.contains("1 of 1"));
        assert!(section.contains("12.5s"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"inquiry\""));
        assert!(json.contains("\"termination\": \"max_rounds_reached\""));
        assert!(json.contains("\"transcript\""));
        assert!(json.contains("\"feedback\": \"Critic, cite sources\""));
    }

    #[test]
    fn test_verdict_filename() {
        assert_eq!(
            verdict_filename("Was X a tyrant?", "md"),
            "Was_X_a_tyrant_verdict.md"
        );
        assert_eq!(
            verdict_filename("  ../../etc/passwd ", "json"),
            "etcpasswd_verdict.json"
        );
        assert_eq!(verdict_filename("???", "md"), "inquiry_verdict.md");
        assert_eq!(
            verdict_filename("Napoléon: hero or tyrant?", "md"),
            "Napoléon_hero_or_tyrant_verdict.md"
        );
        assert_eq!(
            verdict_filename("พระเจ้าตากสิน", "md"),
            "พระเจ้าตากสิน_verdict.md"
        );
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_output_path(&dir.path().join("court_records"), "Napoleon", "md");

        write_report("# Tribunal Verdict\n", &path).unwrap();

        assert_eq!(path.file_name().unwrap(), "Napoleon_verdict.md");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# Tribunal Verdict\n"
        );
    }
}
