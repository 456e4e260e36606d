//! Error taxonomy for pipeline execution.
//!
//! Every variant surfaces to the caller of `Executor::execute`; none are
//! swallowed. The HTTP boundary maps variants to status codes without
//! interpreting pipeline semantics.

use thiserror::Error;

use crate::journal::JournalError;
use crate::step::ValidationError;
use crate::store::StoreError;

/// Terminal error for one pipeline run.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// A step rejected its input on the first attempt; never retried.
    #[error("step '{step}' rejected input: {source}")]
    Validation {
        /// The failing step.
        step: &'static str,
        /// The underlying validation failure.
        #[source]
        source: ValidationError,
    },

    /// A step kept failing until the attempt ceiling was reached.
    #[error("step '{step}' exhausted {attempts} attempts: {source}")]
    RetriesExhausted {
        /// The failing step.
        step: &'static str,
        /// Attempts made before giving up.
        attempts: u32,
        /// The last attempt's underlying cause.
        #[source]
        source: anyhow::Error,
    },

    /// The run was cancelled while executing or waiting out a backoff.
    #[error("run cancelled: {reason}")]
    Cancelled {
        /// Why the run was cancelled.
        reason: String,
    },

    /// The terminal record could not be appended to the result store. The
    /// run computed successfully but must be reported as failed.
    #[error("result store append failed: {0}")]
    Persistence(#[from] StoreError),

    /// The write-ahead journal rejected a record; durability cannot be
    /// guaranteed, so the run fails.
    #[error("journal failure: {0}")]
    Journal(#[from] JournalError),

    /// A journaled step output no longer matches the step's output type.
    #[error("replay of step '{step}' failed: {source}")]
    Replay {
        /// The step whose journaled output failed to decode.
        step: &'static str,
        /// The decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ExecuteError {
    /// Builds a cancellation error from an optional token reason.
    #[must_use]
    pub fn cancelled(reason: Option<String>) -> Self {
        Self::Cancelled {
            reason: reason.unwrap_or_else(|| "cancelled".to_string()),
        }
    }

    /// True when the failure stems from the caller's input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_names_step() {
        let err = ExecuteError::Validation {
            step: "create_transaction",
            source: ValidationError::new("amount must be positive"),
        };
        assert_eq!(
            err.to_string(),
            "step 'create_transaction' rejected input: amount must be positive"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = ExecuteError::RetriesExhausted {
            step: "create_wallet",
            attempts: 3,
            source: anyhow::anyhow!("ledger unavailable"),
        };
        assert_eq!(
            err.to_string(),
            "step 'create_wallet' exhausted 3 attempts: ledger unavailable"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_cancelled_default_reason() {
        let err = ExecuteError::cancelled(None);
        assert_eq!(err.to_string(), "run cancelled: cancelled");
    }
}
