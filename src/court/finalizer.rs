//! The scribe: turns a finished transcript into the written verdict.

use crate::capability::{Capabilities, Timeouts};
use crate::error::CapabilityError;
use crate::models::{FinalArtifact, RoundRecord, Stance, Transcript};
use async_trait::async_trait;
use tracing::info;

/// Writes the final artifact from the full transcript.
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(
        &self,
        inquiry: &str,
        transcript: &Transcript,
        timeouts: &Timeouts,
    ) -> Result<FinalArtifact, CapabilityError>;
}

/// Scribe that drafts the verdict with the generator and appends the
/// complete court record.
pub struct ModelScribe {
    capabilities: Capabilities,
    language: String,
}

impl ModelScribe {
    pub fn new(capabilities: Capabilities, language: impl Into<String>) -> Self {
        Self {
            capabilities,
            language: language.into(),
        }
    }
}

#[async_trait]
impl Finalizer for ModelScribe {
    async fn finalize(
        &self,
        inquiry: &str,
        transcript: &Transcript,
        timeouts: &Timeouts,
    ) -> Result<FinalArtifact, CapabilityError> {
        info!(
            "Scribe drafting the verdict from {} round(s)",
            transcript.len()
        );

        let prompt = build_prompt(inquiry, transcript, &self.language);
        let verdict = self
            .capabilities
            .generate(&prompt, timeouts.generation)
            .await?;

        let mut text = verdict.trim().to_string();
        text.push_str("\n\n");
        text.push_str(&court_record(transcript));

        Ok(FinalArtifact::new(text))
    }
}

fn build_prompt(inquiry: &str, transcript: &Transcript, language: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You are the Court Scribe. Write a Neutral Verdict Report in {} on the subject: {}\n\n",
        language,
        inquiry.trim()
    ));

    for stance in Stance::BOTH {
        prompt.push_str(&format!("## {} Evidence\n\n", stance.advocate()));
        for record in transcript.rounds() {
            prompt.push_str(&format!(
                "### Round {}\n{}\n\n",
                record.round,
                record.statement(stance).text
            ));
        }
    }

    prompt.push_str(REPORT_SECTIONS);
    prompt
}

/// Every round, verbatim, so nothing is lost to model truncation.
fn court_record(transcript: &Transcript) -> String {
    let mut record = String::from("## Court Record\n\n");
    for round in transcript.rounds() {
        record.push_str(&round_entry(round));
    }
    record
}

fn round_entry(round: &RoundRecord) -> String {
    let mut entry = format!("### Round {}\n\n", round.round);

    for stance in Stance::BOTH {
        let statement = round.statement(stance);
        entry.push_str(&format!(
            "**{} {}**\n\n{}\n\n",
            stance.emoji(),
            stance.advocate(),
            statement.text
        ));
        if !statement.snippets.is_empty() {
            entry.push_str("Sources consulted:\n");
            for snippet in &statement.snippets {
                entry.push_str(&format!("- {}\n", snippet.query));
            }
            entry.push('\n');
        }
    }

    if let Some(verdict) = &round.verdict {
        let ruling = if verdict.sufficient {
            "evidence accepted"
        } else {
            "more evidence required"
        };
        entry.push_str(&format!("*Judge ({}):* {}\n\n", ruling, verdict.reasoning));
        if !verdict.feedback.is_empty() {
            entry.push_str(&format!("> {}\n\n", verdict.feedback));
        }
    }

    entry
}

const REPORT_SECTIONS: &str = "The report must contain:\n\
- Introduction\n\
- The Admirer's Argument (Pros)\n\
- The Critic's Argument (Cons)\n\
- Final Neutral Conclusion";
