//! Error taxonomy for capabilities and the deliberation loop.
//!
//! | Error                | Retried by controller | Outcome                 |
//! |----------------------|-----------------------|-------------------------|
//! | `Capability::Timeout`  | once                | `Failure` on 2nd miss   |
//! | `Capability::Provider` | once                | `Failure` on 2nd miss   |
//! | `Capability::NotFound` | no                  | swallowed by advocates  |
//! | `Config`               | no                  | rejected before round 1 |

use crate::court::IllegalTransition;
use crate::models::{Stance, Transcript};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of an external capability (generation or lookup).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("nothing found")]
    NotFound,

    #[error("provider error: {0}")]
    Provider(String),
}

impl CapabilityError {
    /// Whether the controller should make its second attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Provider(_))
    }
}

/// The sub-call a loop failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Research(Stance),
    Arbitration,
    Finalization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Research(stance) => write!(f, "research ({})", stance.advocate()),
            Self::Arbitration => write!(f, "arbitration"),
            Self::Finalization => write!(f, "finalization"),
        }
    }
}

/// Violations of the transcript's ordering rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("round {found} is out of order; expected round {expected}")]
    OutOfOrder { expected: u32, found: u32 },

    #[error("round {0} still awaits a verdict")]
    VerdictPending(u32),

    #[error("statements for round {0} are filed under the wrong stance")]
    StanceMismatch(u32),

    #[error("no round is awaiting a verdict")]
    NothingPending,
}

/// Errors surfaced by the deliberation controller.
#[derive(Debug, Error)]
pub enum CourtError {
    /// Invalid settings, rejected before any work starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A role failed twice (or finalization failed once). No artifact exists.
    #[error("deliberation failed in round {round} during {stage}: {cause}")]
    Failure {
        round: u32,
        stage: Stage,
        #[source]
        cause: CapabilityError,
        /// Rounds that completed before the failure.
        transcript: Box<Transcript>,
    },

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    State(#[from] IllegalTransition),
}

impl CourtError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
