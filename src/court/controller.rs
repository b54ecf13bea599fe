//! The deliberation loop controller.
//!
//! Each round fans the inquiry out to both advocates concurrently, waits at a
//! barrier for both statements, hands them to the arbiter, and either loops
//! with the arbiter's feedback or stops. Every role invocation gets exactly
//! one retry on a retriable failure; finalization gets none.

use crate::capability::{Capabilities, Timeouts};
use crate::court::arbiter::{Arbiter, ModelArbiter};
use crate::court::finalizer::{Finalizer, ModelScribe};
use crate::court::researcher::{Brief, GroundedResearcher, ResearchAgent, ResearchPolicy};
use crate::court::state::{CourtState, StateMachine};
use crate::error::{CapabilityError, CourtError, Stage};
use crate::models::{
    Deliberation, LoopState, PositionStatement, Stance, TerminationReason, Transcript,
};
use futures::future::try_join;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// First call plus one retry.
const MAX_ATTEMPTS: u32 = 2;

/// Drives rounds of research and arbitration until the arbiter is satisfied
/// or the round cap is hit.
pub struct DeliberationController {
    researcher: Arc<dyn ResearchAgent>,
    arbiter: Arc<dyn Arbiter>,
    finalizer: Arc<dyn Finalizer>,
}

impl DeliberationController {
    pub fn new(
        researcher: Arc<dyn ResearchAgent>,
        arbiter: Arc<dyn Arbiter>,
        finalizer: Arc<dyn Finalizer>,
    ) -> Self {
        Self {
            researcher,
            arbiter,
            finalizer,
        }
    }

    /// Build the model-backed court over one set of capabilities.
    pub fn from_capabilities(
        capabilities: Capabilities,
        policy: ResearchPolicy,
        language: &str,
    ) -> Self {
        Self::new(
            Arc::new(GroundedResearcher::new(capabilities.clone(), policy)),
            Arc::new(ModelArbiter::new(capabilities.clone())),
            Arc::new(ModelScribe::new(capabilities, language)),
        )
    }

    /// Run a full deliberation on `inquiry`.
    ///
    /// Returns the artifact with its termination reason, or `Failure` with
    /// the round and stage that broke. Invalid arguments are rejected before
    /// any role is invoked.
    pub async fn run(
        &self,
        inquiry: &str,
        max_rounds: u32,
        timeouts: &Timeouts,
    ) -> Result<Deliberation, CourtError> {
        if max_rounds == 0 {
            return Err(CourtError::config("max_rounds must be at least 1"));
        }
        let inquiry = inquiry.trim();
        if inquiry.is_empty() {
            return Err(CourtError::config("inquiry must not be empty"));
        }
        timeouts.validate()?;

        info!(
            "Court in session on '{}' (up to {} round(s))",
            inquiry, max_rounds
        );

        let mut state = LoopState::new();
        let mut machine = StateMachine::new();
        let mut transcript = Transcript::new();

        let reason = loop {
            state.round += 1;
            machine.set_round(state.round);
            machine.advance(CourtState::AwaitingAgents, None)?;
            info!("Round {}: dispatching both advocates", state.round);

            let convened = self.convene(inquiry, &state, timeouts).await;
            let (positive, negative) = match convened {
                Ok(statements) => statements,
                Err((stage, cause)) => {
                    let round = state.round;
                    return Err(abort(
                        &mut state,
                        &mut machine,
                        transcript,
                        round,
                        stage,
                        cause,
                    ));
                }
            };
            transcript.open_round(positive.clone(), negative.clone())?;

            machine.advance(CourtState::Judging, None)?;
            let judged = with_retry(Stage::Arbitration, state.round, || {
                self.arbiter
                    .judge(&positive, &negative, &transcript, timeouts)
            })
            .await;
            let verdict = match judged {
                Ok(verdict) => verdict,
                Err(cause) => {
                    transcript.discard_pending();
                    let round = state.round;
                    return Err(abort(
                        &mut state,
                        &mut machine,
                        transcript,
                        round,
                        Stage::Arbitration,
                        cause,
                    ));
                }
            };
            transcript.settle_round(verdict.clone())?;

            machine.advance(CourtState::Deciding, None)?;
            if verdict.sufficient {
                info!("Round {}: evidence accepted", state.round);
                state.conclude(TerminationReason::SufficientInfo);
                break TerminationReason::SufficientInfo;
            }
            if state.round >= max_rounds {
                info!(
                    "Round {}: round cap reached without a sufficient ruling",
                    state.round
                );
                state.conclude(TerminationReason::MaxRoundsReached);
                break TerminationReason::MaxRoundsReached;
            }

            info!(
                "Round {}: more evidence required: {}",
                state.round, verdict.feedback
            );
            state.feedback = verdict.feedback;
            machine.advance(CourtState::Dispatching, Some("insufficient"))?;
        };

        machine.advance(CourtState::Finalizing, Some(&reason.to_string()))?;
        let artifact = match self.finalizer.finalize(inquiry, &transcript, timeouts).await {
            Ok(artifact) => artifact,
            Err(cause) => {
                let round = transcript.last_completed_round();
                return Err(abort(
                    &mut state,
                    &mut machine,
                    transcript,
                    round,
                    Stage::Finalization,
                    cause,
                ));
            }
        };
        machine.advance(CourtState::Concluded, None)?;
        log_transitions(&machine);

        info!(
            "Court adjourned after {} round(s): {}",
            transcript.len(),
            reason
        );

        Ok(Deliberation {
            inquiry: inquiry.to_string(),
            artifact,
            reason,
            transcript,
        })
    }

    /// Both advocates, concurrently, behind one barrier.
    ///
    /// The first permanent failure drops the other side's future; its
    /// statement is never used.
    async fn convene(
        &self,
        inquiry: &str,
        state: &LoopState,
        timeouts: &Timeouts,
    ) -> Result<(PositionStatement, PositionStatement), (Stage, CapabilityError)> {
        let positive = Brief {
            stance: Stance::Positive,
            round: state.round,
            inquiry,
            feedback: &state.feedback,
        };
        let negative = Brief {
            stance: Stance::Negative,
            ..positive.clone()
        };

        try_join(
            self.advocate(&positive, timeouts),
            self.advocate(&negative, timeouts),
        )
        .await
    }

    async fn advocate(
        &self,
        brief: &Brief<'_>,
        timeouts: &Timeouts,
    ) -> Result<PositionStatement, (Stage, CapabilityError)> {
        let stage = Stage::Research(brief.stance);
        with_retry(stage, brief.round, || self.researcher.produce(brief, timeouts))
            .await
            .map_err(|cause| (stage, cause))
    }
}

/// Call `op`, retrying once if the failure is retriable.
async fn with_retry<T, F, Fut>(stage: Stage, round: u32, mut op: F) -> Result<T, CapabilityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CapabilityError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retriable() && attempt < MAX_ATTEMPTS => {
                warn!(
                    "Round {}: {} failed (attempt {}/{}), retrying: {}",
                    round, stage, attempt, MAX_ATTEMPTS, e
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Move to `Failed` and build the error the caller sees.
fn abort(
    state: &mut LoopState,
    machine: &mut StateMachine,
    transcript: Transcript,
    round: u32,
    stage: Stage,
    cause: CapabilityError,
) -> CourtError {
    state.conclude(TerminationReason::Failure);
    let failed_in = machine.current();
    if let Err(e) = machine.advance(CourtState::Failed, Some(&cause.to_string())) {
        warn!("{}", e);
    }
    error!(
        "Round {}: {} failed for good in state {}: {}",
        round, stage, failed_in, cause
    );
    log_transitions(machine);

    CourtError::Failure {
        round,
        stage,
        cause,
        transcript: Box::new(transcript),
    }
}

fn log_transitions(machine: &StateMachine) {
    for t in machine.transitions() {
        debug!(
            "[{:>6}ms] round {}: {} -> {}{}",
            t.elapsed_ms,
            t.round,
            t.from,
            t.to,
            t.reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );
    }
}
