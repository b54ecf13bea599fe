//! Transcript aggregation and statistics.
//!
//! This module computes the figures the report shows next to the verdict:
//! how much each side cited, how long each side spoke, and what the arbiter
//! kept asking for.

use crate::models::{DeliberationSummary, Stance, Transcript};
use std::collections::HashMap;

/// Build the summary statistics for a finished transcript.
pub fn summarize(transcript: &Transcript) -> DeliberationSummary {
    DeliberationSummary {
        rounds: transcript.len(),
        positive_citations: citations(transcript, Stance::Positive),
        negative_citations: citations(transcript, Stance::Negative),
        positive_mean_length: mean_statement_length(transcript, Stance::Positive),
        negative_mean_length: mean_statement_length(transcript, Stance::Negative),
        feedback_chain: feedback_chain(transcript),
    }
}

/// Total snippets cited by one side.
pub fn citations(transcript: &Transcript, stance: Stance) -> usize {
    transcript
        .rounds()
        .iter()
        .map(|r| r.statement(stance).snippets.len())
        .sum()
}

/// Mean statement length in characters for one side, 0 for an empty transcript.
pub fn mean_statement_length(transcript: &Transcript, stance: Stance) -> usize {
    if transcript.is_empty() {
        return 0;
    }

    let total: usize = transcript
        .rounds()
        .iter()
        .map(|r| r.statement(stance).text.chars().count())
        .sum();

    total / transcript.len()
}

/// Feedback the arbiter issued, keyed by the round that issued it.
pub fn feedback_chain(transcript: &Transcript) -> Vec<(u32, String)> {
    transcript
        .rounds()
        .iter()
        .filter_map(|r| {
            r.verdict
                .as_ref()
                .filter(|v| !v.feedback.is_empty())
                .map(|v| (r.round, v.feedback.as_str().to_string()))
        })
        .collect()
}

/// The queries that produced the most citations across both sides.
pub fn most_cited_queries(transcript: &Transcript, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for round in transcript.rounds() {
        for stance in Stance::BOTH {
            for snippet in &round.statement(stance).snippets {
                *counts.entry(snippet.query.as_str()).or_default() += 1;
            }
        }
    }

    let mut queries: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(query, count)| (query.to_string(), count))
        .collect();

    queries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    queries.truncate(n);
    queries
}

/// Generate a text summary for the console.
pub fn generate_summary_text(summary: &DeliberationSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Rounds held: {}", summary.rounds));
    lines.push(format!(
        "- {} {}: {} citation(s), ~{} chars per statement",
        Stance::Positive.emoji(),
        Stance::Positive.advocate(),
        summary.positive_citations,
        summary.positive_mean_length
    ));
    lines.push(format!(
        "- {} {}: {} citation(s), ~{} chars per statement",
        Stance::Negative.emoji(),
        Stance::Negative.advocate(),
        summary.negative_citations,
        summary.negative_mean_length
    ));

    if !summary.feedback_chain.is_empty() {
        lines.push(String::new());
        lines.push("Judge's requests:".to_string());
        for (round, feedback) in &summary.feedback_chain {
            lines.push(format!("- after round {}: {}", round, feedback));
        }
    }

    lines.join("\n")
}
