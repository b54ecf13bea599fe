//! External capabilities the court depends on.
//!
//! The court only ever sees two narrow interfaces: a [`Generator`] that turns
//! a prompt into a completion and a [`Lookup`] that turns a query into a
//! snippet. Concrete backends live in the submodules.

pub mod ollama;
pub mod wikipedia;

pub use ollama::{OllamaGenerator, OllamaSettings};
pub use wikipedia::{WikipediaLookup, WikipediaSettings};

use crate::error::{CapabilityError, CourtError};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Text generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for `prompt` within `timeout`.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, CapabilityError>;

    /// Model identifier, for reports.
    fn model_name(&self) -> &str;
}

/// Knowledge lookup backend.
///
/// An empty result is `Err(CapabilityError::NotFound)`, never `Ok("")`.
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, query: &str, timeout: Duration) -> Result<String, CapabilityError>;
}

/// The pair of capabilities injected into each role.
#[derive(Clone)]
pub struct Capabilities {
    pub generator: Arc<dyn Generator>,
    pub lookup: Arc<dyn Lookup>,
}

impl Capabilities {
    pub fn new(generator: Arc<dyn Generator>, lookup: Arc<dyn Lookup>) -> Self {
        Self { generator, lookup }
    }

    /// Generate with the deadline enforced on our side as well.
    pub async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, CapabilityError> {
        bounded(timeout, self.generator.generate(prompt, timeout)).await
    }

    /// Name of the model behind the generator, as it appears in reports.
    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Look up with the deadline enforced on our side as well.
    pub async fn lookup(&self, query: &str, timeout: Duration) -> Result<String, CapabilityError> {
        bounded(timeout, self.lookup.lookup(query, timeout)).await
    }
}

/// Per-call deadlines for each capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub generation: Duration,
    pub lookup: Duration,
}

impl Timeouts {
    pub fn from_secs(generation: u64, lookup: u64) -> Self {
        Self {
            generation: Duration::from_secs(generation),
            lookup: Duration::from_secs(lookup),
        }
    }

    /// Both deadlines must be non-zero.
    pub fn validate(&self) -> Result<(), CourtError> {
        if self.generation.is_zero() {
            return Err(CourtError::config("generation timeout must be greater than zero"));
        }
        if self.lookup.is_zero() {
            return Err(CourtError::config("lookup timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_secs(300, 30)
    }
}

/// Run a capability call, turning an elapsed deadline into `Timeout`.
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, CapabilityError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    struct Sleeper;

    #[async_trait]
    impl Generator for Sleeper {
        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        fn model_name(&self) -> &str {
            "sleeper"
        }
    }

    struct Silent;

    #[async_trait]
    impl Lookup for Silent {
        async fn lookup(&self, _query: &str, _timeout: Duration) -> Result<String, CapabilityError> {
            Err(CapabilityError::NotFound)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_times_out() {
        let caps = Capabilities::new(Arc::new(Sleeper), Arc::new(Silent));
        let result = caps.generate("hello", Duration::from_secs(5)).await;
        assert_eq!(result, Err(CapabilityError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let ok = bounded(Duration::from_secs(1), async { Ok::<_, CapabilityError>(7) }).await;
        assert_eq!(assert_ok!(ok), 7);

        let caps = Capabilities::new(Arc::new(Sleeper), Arc::new(Silent));
        let err = assert_err!(caps.lookup("anything", Duration::from_secs(1)).await);
        assert_eq!(err, CapabilityError::NotFound);
    }

    #[test]
    fn test_model_name_comes_from_generator() {
        let caps = Capabilities::new(Arc::new(Sleeper), Arc::new(Silent));
        assert_eq!(caps.model_name(), "sleeper");
    }

    #[test]
    fn test_timeouts_validation() {
        assert!(Timeouts::default().validate().is_ok());
        assert!(Timeouts::from_secs(0, 30).validate().is_err());
        assert!(Timeouts::from_secs(30, 0).validate().is_err());
    }
}
