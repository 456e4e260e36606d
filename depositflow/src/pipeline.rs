//! Pipeline definition: an ordered, typed chain of steps.
//!
//! Type compatibility between consecutive steps is enforced at
//! construction by the compiler: `then` only accepts a step whose input
//! type equals the chain's current output type. The built definition is
//! immutable and shared read-only across all concurrent runs.

use async_trait::async_trait;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::cancellation::CancelToken;
use crate::errors::ExecuteError;
use crate::journal::{JournalRecord, RunJournal};
use crate::retry::RetryPolicy;
use crate::step::{Step, StepContext, StepError};

/// Shared references threaded through a single run.
#[doc(hidden)]
pub struct RunScope<'a> {
    pub(crate) run_id: Uuid,
    pub(crate) policy: &'a RetryPolicy,
    pub(crate) journal: &'a dyn RunJournal,
    pub(crate) token: &'a CancelToken,
}

impl<'a> RunScope<'a> {
    pub(crate) fn new(
        run_id: Uuid,
        policy: &'a RetryPolicy,
        journal: &'a dyn RunJournal,
        token: &'a CancelToken,
    ) -> Self {
        Self {
            run_id,
            policy,
            journal,
            token,
        }
    }
}

/// Runs one step to completion: journal replay, then retry per policy.
async fn run_single<S: Step>(
    step: &S,
    scope: &RunScope<'_>,
    index: u32,
    input: S::Input,
) -> Result<S::Output, ExecuteError> {
    // Fast-forward: a replayed run skips steps whose output is journaled.
    if let Some(value) = scope
        .journal
        .completed_output(scope.run_id, index)
        .await?
    {
        tracing::debug!(
            run_id = %scope.run_id,
            step = step.name(),
            index,
            "replaying journaled step output"
        );
        return serde_json::from_value(value).map_err(|source| ExecuteError::Replay {
            step: step.name(),
            source,
        });
    }

    let output = run_with_retry(step, scope, index, input).await?;

    let value = serde_json::to_value(&output).map_err(|source| ExecuteError::Replay {
        step: step.name(),
        source,
    })?;
    scope
        .journal
        .record(JournalRecord::step_completed(scope.run_id, index, value))
        .await?;

    Ok(output)
}

/// Attempts one step up to the policy ceiling, backing off in between.
///
/// The backoff wait races the run's cancellation token; a cancelled token
/// aborts the wait promptly and short-circuits the whole run.
async fn run_with_retry<S: Step>(
    step: &S,
    scope: &RunScope<'_>,
    index: u32,
    input: S::Input,
) -> Result<S::Output, ExecuteError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if scope.token.is_cancelled() {
            return Err(ExecuteError::cancelled(scope.token.reason()));
        }

        scope
            .journal
            .record(JournalRecord::step_started(
                scope.run_id,
                index,
                step.name(),
                attempt,
            ))
            .await?;

        let ctx = StepContext {
            run_id: scope.run_id,
            attempt,
        };
        match step.execute(&ctx, input.clone()).await {
            Ok(output) => {
                tracing::debug!(
                    run_id = %scope.run_id,
                    step = step.name(),
                    attempt,
                    "step completed"
                );
                return Ok(output);
            }
            Err(StepError::Validation(source)) => {
                scope
                    .journal
                    .record(JournalRecord::step_failed(
                        scope.run_id,
                        index,
                        attempt,
                        source.to_string(),
                    ))
                    .await?;
                return Err(ExecuteError::Validation {
                    step: step.name(),
                    source,
                });
            }
            Err(StepError::Transient(source)) => {
                scope
                    .journal
                    .record(JournalRecord::step_failed(
                        scope.run_id,
                        index,
                        attempt,
                        source.to_string(),
                    ))
                    .await?;

                match scope.policy.backoff_for_attempt(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            run_id = %scope.run_id,
                            step = step.name(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %source,
                            "step failed, backing off"
                        );
                        tokio::select! {
                            () = tokio::time::sleep(delay) => {}
                            () = scope.token.cancelled() => {
                                return Err(ExecuteError::cancelled(scope.token.reason()));
                            }
                        }
                    }
                    None => {
                        return Err(ExecuteError::RetriesExhausted {
                            step: step.name(),
                            attempts: attempt,
                            source,
                        });
                    }
                }
            }
        }
    }
}

/// A chain of steps transforming `I` into `O`.
#[doc(hidden)]
#[async_trait]
pub trait StepChain<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn run(&self, scope: &RunScope<'_>, index: u32, input: I) -> Result<O, ExecuteError>;

    /// Number of steps in this chain.
    fn len(&self) -> u32;

    /// Collects step names in execution order.
    fn names(&self, out: &mut Vec<&'static str>);
}

/// The first (and possibly only) step of a chain.
#[doc(hidden)]
pub struct FirstStep<S> {
    step: S,
}

#[async_trait]
impl<S> StepChain<S::Input, S::Output> for FirstStep<S>
where
    S: Step,
{
    async fn run(
        &self,
        scope: &RunScope<'_>,
        index: u32,
        input: S::Input,
    ) -> Result<S::Output, ExecuteError> {
        run_single(&self.step, scope, index, input).await
    }

    fn len(&self) -> u32 {
        1
    }

    fn names(&self, out: &mut Vec<&'static str>) {
        out.push(self.step.name());
    }
}

/// A chain extended with one more step at the tail.
#[doc(hidden)]
pub struct ThenStep<Prev, S> {
    prev: Prev,
    step: S,
}

#[async_trait]
impl<Prev, S, I> StepChain<I, S::Output> for ThenStep<Prev, S>
where
    I: Send + Sync + 'static,
    S: Step,
    Prev: StepChain<I, S::Input>,
{
    async fn run(
        &self,
        scope: &RunScope<'_>,
        index: u32,
        input: I,
    ) -> Result<S::Output, ExecuteError> {
        let mid = self.prev.run(scope, index, input).await?;
        run_single(&self.step, scope, index + self.prev.len(), mid).await
    }

    fn len(&self) -> u32 {
        self.prev.len() + 1
    }

    fn names(&self, out: &mut Vec<&'static str>) {
        self.prev.names(out);
        out.push(self.step.name());
    }
}

/// An immutable, ordered pipeline definition from `I` to `O`.
pub struct Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    name: &'static str,
    chain: Box<dyn StepChain<I, O>>,
    step_names: Vec<&'static str>,
}

impl Pipeline<(), ()> {
    /// Starts building a pipeline with its first step.
    pub fn start_with<S>(
        name: &'static str,
        step: S,
    ) -> PipelineBuilder<S::Input, S::Output, FirstStep<S>>
    where
        S: Step + 'static,
    {
        let names = vec![step.name()];
        PipelineBuilder {
            name,
            chain: FirstStep { step },
            names,
            _marker: PhantomData,
        }
    }
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// The pipeline's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> &[&'static str] {
        &self.step_names
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.step_names.len()
    }

    /// Returns true if the pipeline has no steps. Never true for a built
    /// pipeline, which always starts from a first step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.step_names.is_empty()
    }

    pub(crate) async fn run(
        &self,
        scope: &RunScope<'_>,
        input: I,
    ) -> Result<O, ExecuteError> {
        self.chain.run(scope, 0, input).await
    }
}

impl<I, O> std::fmt::Debug for Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &self.step_names)
            .finish()
    }
}

/// Builder accumulating a typed step chain.
pub struct PipelineBuilder<I, O, C> {
    name: &'static str,
    chain: C,
    names: Vec<&'static str>,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, C> PipelineBuilder<I, O, C>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
    C: StepChain<I, O> + 'static,
{
    /// Appends a step whose input type equals the chain's current output.
    pub fn then<S>(self, step: S) -> PipelineBuilder<I, S::Output, ThenStep<C, S>>
    where
        S: Step<Input = O> + 'static,
    {
        let mut names = self.names;
        names.push(step.name());
        PipelineBuilder {
            name: self.name,
            chain: ThenStep {
                prev: self.chain,
                step,
            },
            names,
            _marker: PhantomData,
        }
    }

    /// Finalizes the definition.
    #[must_use]
    pub fn build(self) -> Pipeline<I, O> {
        Pipeline {
            name: self.name,
            chain: Box::new(self.chain),
            step_names: self.names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryJournal;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Double;

    #[async_trait]
    impl Step for Double {
        type Input = i64;
        type Output = i64;

        fn name(&self) -> &'static str {
            "double"
        }

        async fn execute(&self, _ctx: &StepContext, input: i64) -> Result<i64, StepError> {
            Ok(input * 2)
        }
    }

    struct Stringify;

    #[async_trait]
    impl Step for Stringify {
        type Input = i64;
        type Output = String;

        fn name(&self) -> &'static str {
            "stringify"
        }

        async fn execute(&self, _ctx: &StepContext, input: i64) -> Result<String, StepError> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn test_pipeline_metadata() {
        let pipeline = Pipeline::start_with("numbers", Double)
            .then(Double)
            .then(Stringify)
            .build();

        assert_eq!(pipeline.name(), "numbers");
        assert_eq!(pipeline.step_names(), &["double", "double", "stringify"]);
        assert_eq!(pipeline.len(), 3);
        assert!(!pipeline.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_threads_outputs() {
        let pipeline = Pipeline::start_with("numbers", Double)
            .then(Double)
            .then(Stringify)
            .build();

        let journal = MemoryJournal::new();
        let policy = RetryPolicy::default();
        let token = CancelToken::new();
        let scope = RunScope::new(Uuid::new_v4(), &policy, &journal, &token);

        let output = pipeline.run(&scope, 3).await.expect("run");
        assert_eq!(output, "12");
    }

    #[tokio::test]
    async fn test_pipeline_replays_journaled_outputs() {
        let pipeline = Pipeline::start_with("numbers", Double).then(Stringify).build();

        let journal = MemoryJournal::new();
        let run_id = Uuid::new_v4();
        // Pretend a previous process already ran the first step with a
        // different result than a fresh execution would produce.
        journal.insert(JournalRecord::step_completed(
            run_id,
            0,
            serde_json::json!(40),
        ));

        let policy = RetryPolicy::default();
        let token = CancelToken::new();
        let scope = RunScope::new(run_id, &policy, &journal, &token);

        let output = pipeline.run(&scope, 3).await.expect("run");
        assert_eq!(output, "40");
    }
}
