//! Deliberation state machine with legal transition guards.
//!
//! The controller calls [`StateMachine::advance`] at every step of a round.
//! Each call checks the edge against the transition table and appends it to
//! a log, so a finished run can be replayed state by state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// The states a deliberation moves through.
///
/// Every run starts at `Dispatching` and ends at `Concluded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtState {
    /// Handing the inquiry and feedback to both advocates.
    Dispatching,
    /// Waiting at the barrier for both statements.
    AwaitingAgents,
    /// The arbiter is weighing the round.
    Judging,
    /// Choosing between another round and finalization.
    Deciding,
    /// The scribe is writing the verdict.
    Finalizing,
    /// Artifact produced. Terminal.
    Concluded,
    /// A role failed for good. Terminal.
    Failed,
}

impl CourtState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Concluded | Self::Failed)
    }
}

impl fmt::Display for CourtState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatching => write!(f, "Dispatching"),
            Self::AwaitingAgents => write!(f, "AwaitingAgents"),
            Self::Judging => write!(f, "Judging"),
            Self::Deciding => write!(f, "Deciding"),
            Self::Finalizing => write!(f, "Finalizing"),
            Self::Concluded => write!(f, "Concluded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Legal edges:
/// ```text
/// Dispatching    → AwaitingAgents
/// AwaitingAgents → Judging
/// Judging        → Deciding
/// Deciding       → Dispatching | Finalizing
/// Finalizing     → Concluded
/// (non-terminal) → Failed
/// ```
fn is_legal_transition(from: CourtState, to: CourtState) -> bool {
    use CourtState::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Dispatching, AwaitingAgents)
            | (AwaitingAgents, Judging)
            | (Judging, Deciding)
            | (Deciding, Dispatching)
            | (Deciding, Finalizing)
            | (Finalizing, Concluded)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: CourtState,
    pub to: CourtState,
    /// Round in progress when the transition happened.
    pub round: u32,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal court state transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: CourtState,
    pub to: CourtState,
}

/// Tracks the current state and the full transition log of one run.
pub struct StateMachine {
    current: CourtState,
    round: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: CourtState::Dispatching,
            round: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> CourtState {
        self.current
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Move to `to` if the edge is legal, recording it.
    pub fn advance(&mut self, to: CourtState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %record.from,
            to = %record.to,
            round = record.round,
            "court state transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_two_round_walk() {
        let mut sm = StateMachine::new();
        for round in 1..=2 {
            sm.set_round(round);
            sm.advance(CourtState::AwaitingAgents, None).unwrap();
            sm.advance(CourtState::Judging, None).unwrap();
            sm.advance(CourtState::Deciding, None).unwrap();
            if round == 1 {
                sm.advance(CourtState::Dispatching, Some("insufficient")).unwrap();
            }
        }
        sm.advance(CourtState::Finalizing, Some("sufficient")).unwrap();
        sm.advance(CourtState::Concluded, None).unwrap();

        assert_eq!(sm.current(), CourtState::Concluded);
        assert_eq!(sm.transitions().len(), 9);
        assert_eq!(sm.transitions()[3].reason.as_deref(), Some("insufficient"));
        assert_eq!(sm.transitions()[8].round, 2);
    }

    #[test]
    fn test_cannot_skip_the_barrier() {
        let mut sm = StateMachine::new();
        let err = sm.advance(CourtState::Judging, None).unwrap_err();
        assert_eq!(err.from, CourtState::Dispatching);
        assert_eq!(err.to, CourtState::Judging);
        assert!(sm.transitions().is_empty());
    }

    #[test]
    fn test_any_live_state_can_fail() {
        let mut sm = StateMachine::new();
        sm.advance(CourtState::AwaitingAgents, None).unwrap();
        sm.advance(CourtState::Failed, Some("advocate down")).unwrap();
        assert!(sm.current().is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut sm = StateMachine::new();
        sm.advance(CourtState::Failed, None).unwrap();
        assert!(sm.advance(CourtState::Failed, None).is_err());
        assert!(sm.advance(CourtState::Dispatching, None).is_err());
    }

    #[test]
    fn test_deciding_cannot_conclude_without_finalizing() {
        let mut sm = StateMachine::new();
        sm.advance(CourtState::AwaitingAgents, None).unwrap();
        sm.advance(CourtState::Judging, None).unwrap();
        sm.advance(CourtState::Deciding, None).unwrap();
        assert!(sm.advance(CourtState::Concluded, None).is_err());
    }
}
