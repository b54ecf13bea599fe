//! The arbiter: judges whether a round's evidence is balanced and sufficient.

use crate::capability::{Capabilities, Timeouts};
use crate::error::CapabilityError;
use crate::models::{Feedback, PositionStatement, Transcript, Verdict};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// Rules on a round given both statements and the transcript so far.
#[async_trait]
pub trait Arbiter: Send + Sync {
    async fn judge(
        &self,
        positive: &PositionStatement,
        negative: &PositionStatement,
        transcript: &Transcript,
        timeouts: &Timeouts,
    ) -> Result<Verdict, CapabilityError>;
}

/// Arbiter that asks the generator for a JSON ruling.
pub struct ModelArbiter {
    capabilities: Capabilities,
}

impl ModelArbiter {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Arbiter for ModelArbiter {
    async fn judge(
        &self,
        positive: &PositionStatement,
        negative: &PositionStatement,
        transcript: &Transcript,
        timeouts: &Timeouts,
    ) -> Result<Verdict, CapabilityError> {
        let prompt = build_prompt(positive, negative, transcript);
        let response = self
            .capabilities
            .generate(&prompt, timeouts.generation)
            .await?;

        let verdict = parse_verdict(&response)?;
        info!(
            "Arbiter ruled round {} {}",
            positive.round,
            if verdict.sufficient {
                "sufficient"
            } else {
                "insufficient"
            }
        );
        Ok(verdict)
    }
}

/// The JSON shape the arbiter is asked to answer in.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    sufficient: bool,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    reasoning: String,
}

/// Parse the arbiter's completion into a verdict.
///
/// Accepts the JSON object anywhere in the text (models like to wrap it in
/// prose or code fences).
fn parse_verdict(response: &str) -> Result<Verdict, CapabilityError> {
    let start = response.find('{');
    let end = response.rfind('}');

    let raw: RawVerdict = match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&response[start..=end])
            .map_err(|e| {
                CapabilityError::Provider(format!("Arbiter returned an unreadable ruling: {}", e))
            })?,
        _ => {
            debug!("Arbiter response without JSON: {}", response);
            return Err(CapabilityError::Provider(
                "Arbiter returned no ruling object".to_string(),
            ));
        }
    };

    if raw.sufficient {
        return Ok(Verdict::sufficient(raw.reasoning.trim()));
    }

    let feedback = if raw.feedback.trim().is_empty() {
        Feedback::new(raw.reasoning.as_str())
    } else {
        Feedback::new(raw.feedback)
    };
    Ok(Verdict::insufficient(feedback, raw.reasoning.trim()))
}

fn build_prompt(
    positive: &PositionStatement,
    negative: &PositionStatement,
    transcript: &Transcript,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(JUDGE_PROMPT);
    prompt.push_str("\n\n");

    let earlier: Vec<_> = transcript
        .rounds()
        .iter()
        .filter(|r| r.round < positive.round)
        .filter_map(|r| r.verdict.as_ref().map(|v| (r.round, v)))
        .collect();

    if !earlier.is_empty() {
        prompt.push_str("## Earlier Rulings\n\n");
        for (round, verdict) in earlier {
            prompt.push_str(&format!("- Round {}: {}", round, verdict.reasoning));
            if !verdict.feedback.is_empty() {
                prompt.push_str(&format!(" (asked for: {})", verdict.feedback));
            }
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("## Round {} Evidence\n\n", positive.round));
    for statement in [positive, negative] {
        prompt.push_str(&format!(
            "### {} ({} citation(s))\n{}\n\n",
            statement.stance.advocate(),
            statement.snippets.len(),
            statement.text
        ));
    }

    prompt.push_str(RULING_FORMAT);
    prompt
}

const JUDGE_PROMPT: &str = "You are 'The Judge'. You ensure a fair trial by checking whether \
there is enough information from both sides.\n\
1. Check for Balance: is one side detailed while the other is empty or too short?\n\
2. Check for Sufficiency: is there enough substance to form a verdict?";

const RULING_FORMAT: &str = r#"Answer with a single JSON object and nothing else:
{"sufficient": true or false, "feedback": "specific instructions for the advocates if insufficient, e.g. 'Critic, find more about his later years'", "reasoning": "one or two sentences"}"#;
