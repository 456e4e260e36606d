//! Step trait and step-level error types.
//!
//! Steps are the fundamental units of work in a depositflow pipeline: a
//! typed input, a typed output, and a fallible side-effecting function.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Error raised when a step rejects its input as malformed or semantically
/// invalid. Validation failures are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by a single step attempt.
#[derive(Debug, Error)]
pub enum StepError {
    /// The input is invalid. Fails the run on the first attempt.
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    /// A transient failure worth retrying per the retry policy.
    #[error("transient: {0}")]
    Transient(#[source] anyhow::Error),
}

impl StepError {
    /// Creates a transient (retryable) error.
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        Self::Transient(err.into())
    }

    /// Creates a validation error from a message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Per-attempt execution context handed to a step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    /// Identifier of the enclosing pipeline run.
    pub run_id: Uuid,
    /// 1-indexed attempt number within this step's current turn.
    pub attempt: u32,
}

/// A unit of work that transforms a typed input into a typed output.
///
/// The executor provides at-least-once semantics: a step must tolerate
/// re-invocation with the same logical input, both across retries and when
/// a replayed process runs an attempt again. Producing a different freshly
/// generated identifier per attempt is acceptable; no earlier attempt's
/// output is ever observed by the caller on failure.
///
/// Outputs must serialize so the write-ahead journal can replay them after
/// a restart.
#[async_trait]
pub trait Step: Send + Sync {
    /// The input type this step accepts.
    type Input: Send + Sync + Clone + Serialize + DeserializeOwned + 'static;

    /// The output type this step produces.
    type Output: Send + Sync + Serialize + DeserializeOwned + 'static;

    /// The name of this step for logging and journaling.
    fn name(&self) -> &'static str;

    /// Executes one attempt of the step.
    async fn execute(
        &self,
        ctx: &StepContext,
        input: Self::Input,
    ) -> Result<Self::Output, StepError>;
}
