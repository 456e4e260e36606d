//! Pipeline executor: drives one run end to end.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::cancellation::CancelToken;
use crate::errors::ExecuteError;
use crate::journal::{JournalError, JournalRecord, RunJournal};
use crate::pipeline::{Pipeline, RunScope};
use crate::retry::RetryPolicy;
use crate::store::{ResultStore, StoreError, TerminalRecord};

/// Runs a pipeline definition against individual requests, applying the
/// retry policy per step, threading cancellation, journaling progress, and
/// appending the terminal record to the result store.
///
/// The executor exclusively owns a run's in-flight intermediate values;
/// only the terminal record is handed to the store.
pub struct Executor<I, O>
where
    I: Send + 'static,
    O: TerminalRecord,
{
    pipeline: Arc<Pipeline<I, O>>,
    policy: RetryPolicy,
    journal: Arc<dyn RunJournal>,
    store: Arc<dyn ResultStore<O>>,
}

impl<I, O> Executor<I, O>
where
    I: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    O: TerminalRecord + Send + Sync + 'static,
{
    /// Creates an executor over an immutable pipeline definition.
    pub fn new(
        pipeline: Arc<Pipeline<I, O>>,
        policy: RetryPolicy,
        journal: Arc<dyn RunJournal>,
        store: Arc<dyn ResultStore<O>>,
    ) -> Self {
        Self {
            pipeline,
            policy,
            journal,
            store,
        }
    }

    /// The pipeline definition this executor runs.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline<I, O> {
        &self.pipeline
    }

    /// The retry policy shared by every step.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The result store terminal records are appended to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ResultStore<O>> {
        &self.store
    }

    /// The write-ahead journal backing this executor.
    #[must_use]
    pub fn journal(&self) -> &Arc<dyn RunJournal> {
        &self.journal
    }

    /// Executes the pipeline for one logical request.
    ///
    /// Exactly one record is appended to the store on success; zero on
    /// failure. Re-submitting a `run_id` whose record already exists
    /// returns that record without re-executing anything.
    pub async fn execute(
        &self,
        token: &CancelToken,
        run_id: Uuid,
        input: I,
    ) -> Result<O, ExecuteError> {
        if let Some(existing) = self.store.get(run_id) {
            tracing::debug!(%run_id, "run already recorded, returning existing result");
            return Ok(existing);
        }
        if token.is_cancelled() {
            return Err(ExecuteError::cancelled(token.reason()));
        }

        let input_value = serde_json::to_value(&input).map_err(JournalError::Encoding)?;
        self.journal
            .record(JournalRecord::run_started(
                run_id,
                self.pipeline.name(),
                input_value,
            ))
            .await?;

        let scope = RunScope::new(run_id, &self.policy, self.journal.as_ref(), token);
        match self.pipeline.run(&scope, input).await {
            Ok(output) => self.record_success(run_id, output).await,
            Err(err) => {
                // A journal failure means further writes are futile; any
                // other failure is terminal and recorded as such.
                if !matches!(err, ExecuteError::Journal(_)) {
                    self.journal
                        .record(JournalRecord::run_failed(run_id, err.to_string()))
                        .await
                        .ok();
                }
                tracing::warn!(
                    %run_id,
                    pipeline = self.pipeline.name(),
                    error = %err,
                    "run failed"
                );
                Err(err)
            }
        }
    }

    async fn record_success(&self, run_id: Uuid, output: O) -> Result<O, ExecuteError> {
        if let Err(err) = self.store.append(output.clone()) {
            // A duplicate means a replayed submission of this run already
            // recorded its result; report that result as the outcome.
            if matches!(err, StoreError::DuplicateRun(_)) {
                if let Some(existing) = self.store.get(run_id) {
                    self.journal
                        .record(JournalRecord::run_completed(run_id))
                        .await?;
                    return Ok(existing);
                }
            }
            self.journal
                .record(JournalRecord::run_failed(run_id, err.to_string()))
                .await
                .ok();
            return Err(ExecuteError::Persistence(err));
        }

        self.journal
            .record(JournalRecord::run_completed(run_id))
            .await?;
        tracing::info!(
            %run_id,
            pipeline = self.pipeline.name(),
            "run completed"
        );
        Ok(output)
    }
}

impl<I, O> std::fmt::Debug for Executor<I, O>
where
    I: Send + 'static,
    O: TerminalRecord,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("pipeline", &self.pipeline.name())
            .field("policy", &self.policy)
            .finish()
    }
}
