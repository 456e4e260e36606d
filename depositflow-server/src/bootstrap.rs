//! Shared wiring for the deployment topologies.
//!
//! Each binary is a thin composition root over these functions; the
//! pipeline logic itself lives once, in the core crate.

use std::sync::Arc;

use depositflow::cancellation::CancelToken;
use depositflow::domain::DepositRequest;
use depositflow::journal::{FileJournal, JournalError, MemoryJournal, RunJournal};
use depositflow::steps::{deposit_executor, DepositExecutor};
use depositflow::store::MemoryResultStore;

use crate::config::Config;

/// Initializes the tracing subscriber from `RUST_LOG`, defaulting to info.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Builds the executor the way the configuration asks: file-backed journal
/// when a path is configured, in-memory otherwise.
pub fn build_executor(config: &Config) -> Result<Arc<DepositExecutor>, JournalError> {
    let journal: Arc<dyn RunJournal> = match &config.journal.path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening file journal");
            Arc::new(FileJournal::open(path)?)
        }
        None => {
            tracing::info!("using in-memory journal; runs will not survive restarts");
            Arc::new(MemoryJournal::new())
        }
    };

    let store = Arc::new(MemoryResultStore::new());
    Ok(Arc::new(deposit_executor(
        config.retry.to_policy(),
        journal,
        store,
    )))
}

/// Outcome of a recovery pass over the journal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Runs driven to a terminal result.
    pub replayed: usize,
    /// Runs that could not be replayed.
    pub failed: usize,
}

/// Re-executes every run the journal recorded as incomplete.
///
/// Completed steps are skipped via journal fast-forward, so this is cheap
/// for runs that crashed late in the sequence.
pub async fn replay_incomplete(executor: &DepositExecutor) -> Result<ReplaySummary, JournalError> {
    let pending = executor.journal().incomplete_runs().await?;
    let mut summary = ReplaySummary::default();

    for (run_id, input) in pending {
        let request: DepositRequest = match serde_json::from_value(input) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(%run_id, error = %err, "journaled input no longer decodes");
                summary.failed += 1;
                continue;
            }
        };

        let token = CancelToken::new();
        match executor.execute(&token, run_id, request).await {
            Ok(deposit) => {
                tracing::info!(%run_id, deposit_id = %deposit.deposit_id, "replayed run completed");
                summary.replayed += 1;
            }
            Err(err) => {
                tracing::warn!(%run_id, error = %err, "replayed run failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
