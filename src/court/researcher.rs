//! The advocates: research agents that argue one side of the inquiry.

use crate::capability::{Capabilities, Timeouts};
use crate::error::CapabilityError;
use crate::models::{Feedback, PositionStatement, Snippet, Stance};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Immutable snapshot of what an advocate receives for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brief<'a> {
    pub stance: Stance,
    pub round: u32,
    pub inquiry: &'a str,
    pub feedback: &'a Feedback,
}

/// Produces one position statement per stance per round.
#[async_trait]
pub trait ResearchAgent: Send + Sync {
    async fn produce(
        &self,
        brief: &Brief<'_>,
        timeouts: &Timeouts,
    ) -> Result<PositionStatement, CapabilityError>;
}

/// How an advocate searches before it writes.
#[derive(Debug, Clone)]
pub struct ResearchPolicy {
    /// Lookup calls per advocate per round (at least one).
    pub lookups_per_round: usize,
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
}

impl Default for ResearchPolicy {
    fn default() -> Self {
        Self {
            lookups_per_round: 1,
            positive_keywords: ["achievements", "success", "legacy", "honors"]
                .into_iter()
                .map(String::from)
                .collect(),
            negative_keywords: ["controversy", "criticism", "failures", "scandals"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ResearchPolicy {
    pub fn keywords(&self, stance: Stance) -> &[String] {
        match stance {
            Stance::Positive => &self.positive_keywords,
            Stance::Negative => &self.negative_keywords,
        }
    }

    /// Queries an advocate issues for a brief, in order.
    ///
    /// Stance-flavoured search first, then whatever the arbiter asked for,
    /// then one query per keyword.
    pub fn queries(&self, brief: &Brief<'_>) -> Vec<String> {
        let inquiry = brief.inquiry.trim();
        let keywords = self.keywords(brief.stance);

        let mut queries = Vec::new();
        if keywords.is_empty() {
            queries.push(inquiry.to_string());
        } else {
            queries.push(format!("{} {}", inquiry, keywords.join(" ")));
        }
        if !brief.feedback.is_empty() {
            queries.push(format!("{} {}", inquiry, brief.feedback));
        }
        queries.extend(keywords.iter().map(|k| format!("{} {}", inquiry, k)));

        let mut seen = HashSet::new();
        queries.retain(|q| seen.insert(q.clone()));
        queries.truncate(self.lookups_per_round.max(1));
        queries
    }
}

/// An advocate that grounds its statement on lookups, then writes it.
pub struct GroundedResearcher {
    capabilities: Capabilities,
    policy: ResearchPolicy,
}

impl GroundedResearcher {
    pub fn new(capabilities: Capabilities, policy: ResearchPolicy) -> Self {
        Self {
            capabilities,
            policy,
        }
    }

    /// Run every planned lookup, keeping whatever comes back.
    async fn gather(&self, brief: &Brief<'_>, timeouts: &Timeouts) -> Vec<Snippet> {
        let mut snippets = Vec::new();

        for query in self.policy.queries(brief) {
            match self.capabilities.lookup(&query, timeouts.lookup).await {
                Ok(text) if !text.trim().is_empty() => snippets.push(Snippet {
                    query,
                    text: text.trim().to_string(),
                }),
                Ok(_) | Err(CapabilityError::NotFound) => {
                    debug!("{}: nothing found for '{}'", brief.stance.advocate(), query);
                }
                Err(e) => {
                    warn!(
                        "{}: lookup '{}' failed, continuing without it: {}",
                        brief.stance.advocate(),
                        query,
                        e
                    );
                }
            }
        }

        snippets
    }
}

#[async_trait]
impl ResearchAgent for GroundedResearcher {
    async fn produce(
        &self,
        brief: &Brief<'_>,
        timeouts: &Timeouts,
    ) -> Result<PositionStatement, CapabilityError> {
        let snippets = self.gather(brief, timeouts).await;
        info!(
            "{} gathered {} snippet(s) for round {}",
            brief.stance.advocate(),
            snippets.len(),
            brief.round
        );

        let prompt = build_prompt(brief, &snippets);
        let text = self
            .capabilities
            .generate(&prompt, timeouts.generation)
            .await?;

        if text.trim().is_empty() {
            return Err(CapabilityError::Provider(format!(
                "{} produced an empty statement",
                brief.stance.advocate()
            )));
        }

        Ok(PositionStatement {
            stance: brief.stance,
            round: brief.round,
            text: text.trim().to_string(),
            snippets,
        })
    }
}

fn build_prompt(brief: &Brief<'_>, snippets: &[Snippet]) -> String {
    let mut prompt = String::new();
    prompt.push_str(stance_framing(brief.stance));
    prompt.push_str("\n\n");
    prompt.push_str(&format!("## Subject\n\n{}\n\n", brief.inquiry.trim()));

    if !brief.feedback.is_empty() {
        prompt.push_str(&format!(
            "## Judge's Feedback\n\nThe judge found the evidence lacking. Address this specifically:\n{}\n\n",
            brief.feedback
        ));
    }

    prompt.push_str("## Research Notes\n\n");
    if snippets.is_empty() {
        prompt.push_str("No reference material was found. Argue from what you know.\n\n");
    } else {
        for snippet in snippets {
            prompt.push_str(&format!("### Search: {}\n{}\n\n", snippet.query, snippet.text));
        }
    }

    prompt.push_str("Summarize the facts that support your side in a few concise paragraphs.");
    prompt
}

fn stance_framing(stance: Stance) -> &'static str {
    match stance {
        Stance::Positive => ADMIRER_FRAMING,
        Stance::Negative => CRITIC_FRAMING,
    }
}

const ADMIRER_FRAMING: &str = "You are 'The Admirer' in a historical court. \
You present the positive side of the subject: achievements, successes, legacy and honors. \
Do NOT report controversies. Focus ONLY on the good side.";

const CRITIC_FRAMING: &str = "You are 'The Critic' in a historical court. \
You present the negative side of the subject: controversies, criticism, failures and scandals. \
Do NOT report achievements. Focus ONLY on the bad side.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Generator, Lookup};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, CapabilityError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("A measured statement.".to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, CapabilityError> {
            Err(CapabilityError::Provider("model offline".into()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    /// Answers every query with a fixed outcome and records the queries.
    struct ScriptedLookup {
        outcome: Result<String, CapabilityError>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn new(outcome: Result<String, CapabilityError>) -> Self {
            Self {
                outcome,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Lookup for ScriptedLookup {
        async fn lookup(&self, query: &str, _timeout: Duration) -> Result<String, CapabilityError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.outcome.clone()
        }
    }

    fn brief<'a>(stance: Stance, feedback: &'a Feedback) -> Brief<'a> {
        Brief {
            stance,
            round: 2,
            inquiry: "Was X a tyrant?",
            feedback,
        }
    }

    #[test]
    fn test_query_plan_defaults_to_one_stance_query() {
        let policy = ResearchPolicy::default();
        let feedback = Feedback::default();
        let queries = policy.queries(&brief(Stance::Negative, &feedback));
        assert_eq!(
            queries,
            vec!["Was X a tyrant? controversy criticism failures scandals".to_string()]
        );
    }

    #[test]
    fn test_query_plan_targets_feedback_second() {
        let policy = ResearchPolicy {
            lookups_per_round: 3,
            ..ResearchPolicy::default()
        };
        let feedback = Feedback::new("his later years");
        let queries = policy.queries(&brief(Stance::Positive, &feedback));
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[1], "Was X a tyrant? his later years");
        assert_eq!(queries[2], "Was X a tyrant? achievements");
    }

    #[test]
    fn test_query_plan_never_repeats_a_query() {
        let policy = ResearchPolicy {
            lookups_per_round: 3,
            positive_keywords: vec!["legacy".to_string()],
            negative_keywords: vec![],
        };
        let feedback = Feedback::new("his reforms");
        let queries = policy.queries(&brief(Stance::Positive, &feedback));

        assert_eq!(
            queries,
            vec![
                "Was X a tyrant? legacy".to_string(),
                "Was X a tyrant? his reforms".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_produce_cites_snippets() {
        let generator = Arc::new(EchoGenerator::default());
        let lookup = Arc::new(ScriptedLookup::new(Ok("X: ruled for 20 years".into())));
        let researcher = GroundedResearcher::new(
            Capabilities::new(generator.clone(), lookup.clone()),
            ResearchPolicy::default(),
        );
        let feedback = Feedback::new("find more about reforms");

        let statement = researcher
            .produce(&brief(Stance::Positive, &feedback), &Timeouts::default())
            .await
            .unwrap();

        assert_eq!(statement.stance, Stance::Positive);
        assert_eq!(statement.round, 2);
        assert_eq!(statement.snippets.len(), 1);
        assert_eq!(statement.snippets[0].text, "X: ruled for 20 years");

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("The Admirer"));
        assert!(prompts[0].contains("find more about reforms"));
        assert!(prompts[0].contains("ruled for 20 years"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_fatal() {
        let generator = Arc::new(EchoGenerator::default());
        let lookup = Arc::new(ScriptedLookup::new(Err(CapabilityError::Provider(
            "wiki down".into(),
        ))));
        let researcher = GroundedResearcher::new(
            Capabilities::new(generator.clone(), lookup),
            ResearchPolicy::default(),
        );
        let feedback = Feedback::default();

        let statement = researcher
            .produce(&brief(Stance::Negative, &feedback), &Timeouts::default())
            .await
            .unwrap();

        assert!(statement.snippets.is_empty());
        assert_eq!(statement.text, "A measured statement.");
        assert!(generator.prompts.lock().unwrap()[0].contains("No reference material"));
    }

    #[tokio::test]
    async fn test_not_found_yields_empty_snippets() {
        let lookup = Arc::new(ScriptedLookup::new(Err(CapabilityError::NotFound)));
        let researcher = GroundedResearcher::new(
            Capabilities::new(Arc::new(EchoGenerator::default()), lookup.clone()),
            ResearchPolicy {
                lookups_per_round: 2,
                ..ResearchPolicy::default()
            },
        );
        let feedback = Feedback::default();

        let statement = researcher
            .produce(&brief(Stance::Positive, &feedback), &Timeouts::default())
            .await
            .unwrap();

        assert!(statement.snippets.is_empty());
        assert_eq!(lookup.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let researcher = GroundedResearcher::new(
            Capabilities::new(
                Arc::new(FailingGenerator),
                Arc::new(ScriptedLookup::new(Ok("snippet".into()))),
            ),
            ResearchPolicy::default(),
        );
        let feedback = Feedback::default();

        let result = researcher
            .produce(&brief(Stance::Positive, &feedback), &Timeouts::default())
            .await;

        assert_eq!(
            result,
            Err(CapabilityError::Provider("model offline".into()))
        );
    }
}
