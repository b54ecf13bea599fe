//! Data models for the court.
//!
//! This module contains the core data structures used throughout the
//! application: stances, position statements, verdicts, the round-by-round
//! transcript, and the report handed to persistence.

use crate::error::TranscriptError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The side an advocate argues for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    /// Argues achievements, legacy, and merit.
    Positive,
    /// Argues controversy, failures, and criticism.
    Negative,
}

impl Stance {
    /// Both stances, in the order they appear in a round record.
    pub const BOTH: [Stance; 2] = [Stance::Positive, Stance::Negative];

    /// Courtroom title of the advocate holding this stance.
    pub fn advocate(&self) -> &'static str {
        match self {
            Stance::Positive => "The Admirer",
            Stance::Negative => "The Critic",
        }
    }

    /// Returns an emoji representation of the stance.
    pub fn emoji(&self) -> &'static str {
        match self {
            Stance::Positive => "🟢",
            Stance::Negative => "🔴",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stance::Positive => write!(f, "Positive"),
            Stance::Negative => write!(f, "Negative"),
        }
    }
}

/// A lookup result an advocate cited in its statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// The query that produced this snippet.
    pub query: String,
    /// Text returned by the lookup.
    pub text: String,
}

/// One advocate's output for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionStatement {
    pub stance: Stance,
    /// Round this statement was produced in (1-indexed).
    pub round: u32,
    pub text: String,
    /// Snippets the statement is grounded on. Empty when every lookup failed.
    pub snippets: Vec<Snippet>,
}

/// Arbiter instructions for the next round.
///
/// Empty on round 1 and after a sufficient verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feedback(String);

impl Feedback {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The arbiter's ruling on one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the evidence is balanced and sufficient to write a verdict.
    pub sufficient: bool,
    pub feedback: Feedback,
    pub reasoning: String,
}

impl Verdict {
    /// A ruling that closes the deliberation. Carries no feedback.
    pub fn sufficient(reasoning: impl Into<String>) -> Self {
        Self {
            sufficient: true,
            feedback: Feedback::default(),
            reasoning: reasoning.into(),
        }
    }

    /// A ruling that sends both advocates back with instructions.
    pub fn insufficient(feedback: Feedback, reasoning: impl Into<String>) -> Self {
        Self {
            sufficient: false,
            feedback,
            reasoning: reasoning.into(),
        }
    }
}

/// Everything said and decided in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (1-indexed).
    pub round: u32,
    pub positive: PositionStatement,
    pub negative: PositionStatement,
    /// `None` while the arbiter is still judging this round.
    pub verdict: Option<Verdict>,
}

impl RoundRecord {
    /// The statement made for the given stance.
    pub fn statement(&self, stance: Stance) -> &PositionStatement {
        match stance {
            Stance::Positive => &self.positive,
            Stance::Negative => &self.negative,
        }
    }
}

/// Append-only, chronologically ordered history of one deliberation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    rounds: Vec<RoundRecord>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rounds recorded, including one whose verdict is pending.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Highest round number with a verdict, or 0 if none.
    pub fn last_completed_round(&self) -> u32 {
        self.rounds
            .iter()
            .rev()
            .find(|r| r.verdict.is_some())
            .map(|r| r.round)
            .unwrap_or(0)
    }

    /// Append a provisional record for the next round.
    ///
    /// The statements must belong to round `len + 1` and to their own stance,
    /// and the previous round must already have its verdict.
    pub fn open_round(
        &mut self,
        positive: PositionStatement,
        negative: PositionStatement,
    ) -> Result<u32, TranscriptError> {
        if let Some(last) = self.rounds.last() {
            if last.verdict.is_none() {
                return Err(TranscriptError::VerdictPending(last.round));
            }
        }

        let expected = self.rounds.len() as u32 + 1;
        for statement in [&positive, &negative] {
            if statement.round != expected {
                return Err(TranscriptError::OutOfOrder {
                    expected,
                    found: statement.round,
                });
            }
        }
        if positive.stance != Stance::Positive || negative.stance != Stance::Negative {
            return Err(TranscriptError::StanceMismatch(expected));
        }

        self.rounds.push(RoundRecord {
            round: expected,
            positive,
            negative,
            verdict: None,
        });
        Ok(expected)
    }

    /// Fill in the verdict of the pending round.
    pub fn settle_round(&mut self, verdict: Verdict) -> Result<&RoundRecord, TranscriptError> {
        match self.rounds.last_mut() {
            Some(record) if record.verdict.is_none() => {
                record.verdict = Some(verdict);
                Ok(record)
            }
            _ => Err(TranscriptError::NothingPending),
        }
    }

    /// Drop a trailing round whose verdict never arrived.
    pub(crate) fn discard_pending(&mut self) -> Option<RoundRecord> {
        if self.rounds.last().is_some_and(|r| r.verdict.is_none()) {
            self.rounds.pop()
        } else {
            None
        }
    }
}

/// Why the deliberation loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The arbiter judged the evidence sufficient.
    SufficientInfo,
    /// The round cap was hit without a sufficient verdict.
    MaxRoundsReached,
    /// A role failed after its retry.
    Failure,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::SufficientInfo => write!(f, "Sufficient information"),
            TerminationReason::MaxRoundsReached => write!(f, "Maximum rounds reached"),
            TerminationReason::Failure => write!(f, "Failure"),
        }
    }
}

/// Mutable loop bookkeeping, owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    /// Current round number (0 before the first round starts).
    pub round: u32,
    /// Feedback the advocates receive this round.
    pub feedback: Feedback,
    pub terminal: bool,
    pub reason: Option<TerminationReason>,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the loop finished for the given reason.
    pub fn conclude(&mut self, reason: TerminationReason) {
        self.terminal = true;
        self.reason = Some(reason);
    }
}

/// The written verdict, produced exactly once per successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalArtifact(String);

impl FinalArtifact {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Result of a deliberation that produced an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deliberation {
    pub inquiry: String,
    pub artifact: FinalArtifact,
    /// Either `SufficientInfo` or `MaxRoundsReached`.
    pub reason: TerminationReason,
    pub transcript: Transcript,
}

impl Deliberation {
    pub fn rounds_held(&self) -> usize {
        self.transcript.len()
    }
}

/// Statistics over a finished transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliberationSummary {
    /// Number of rounds held.
    pub rounds: usize,
    /// Snippets cited by the positive advocate across all rounds.
    pub positive_citations: usize,
    /// Snippets cited by the negative advocate across all rounds.
    pub negative_citations: usize,
    /// Mean statement length in characters, positive side.
    pub positive_mean_length: usize,
    /// Mean statement length in characters, negative side.
    pub negative_mean_length: usize,
    /// Feedback the arbiter issued, by the round that issued it.
    pub feedback_chain: Vec<(u32, String)>,
}

/// Metadata about the court report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// The inquiry under deliberation.
    pub inquiry: String,
    /// Date and time the report was produced.
    pub report_date: DateTime<Utc>,
    /// Name of the LLM model used.
    pub model_used: String,
    /// Rounds actually held.
    pub rounds_held: usize,
    /// Configured round cap.
    pub max_rounds: u32,
    /// Why the court adjourned.
    pub termination: TerminationReason,
    /// Wall-clock duration of the deliberation in seconds.
    pub duration_seconds: f64,
}

/// The complete court report handed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtReport {
    pub metadata: ReportMetadata,
    pub summary: DeliberationSummary,
    /// The written verdict.
    pub artifact: FinalArtifact,
    /// Full record of the deliberation.
    pub transcript: Transcript,
}
