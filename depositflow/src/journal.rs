//! Write-ahead journal of run and step events.
//!
//! The journal is the durability substrate: every step attempt and outcome
//! is recorded, keyed by run id, before the executor advances. A restarted
//! process re-submits incomplete runs and the executor fast-forwards past
//! steps whose completed output is already journaled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Error raised by a journal backend.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The backing medium rejected the write or read.
    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("journal encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One durable journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A run was admitted with the given initial input.
    RunStarted {
        /// The run identifier.
        run_id: Uuid,
        /// Name of the pipeline definition.
        pipeline: String,
        /// The serialized initial input, for replay.
        input: Value,
        /// When the record was written.
        at: DateTime<Utc>,
    },
    /// A step attempt began.
    StepStarted {
        /// The run identifier.
        run_id: Uuid,
        /// 0-indexed position in the pipeline.
        step_index: u32,
        /// The step's name.
        step_name: String,
        /// 1-indexed attempt number.
        attempt: u32,
        /// When the record was written.
        at: DateTime<Utc>,
    },
    /// A step completed; its output is durable from here on.
    StepCompleted {
        /// The run identifier.
        run_id: Uuid,
        /// 0-indexed position in the pipeline.
        step_index: u32,
        /// The serialized step output, for replay.
        output: Value,
        /// When the record was written.
        at: DateTime<Utc>,
    },
    /// A step attempt failed.
    StepFailed {
        /// The run identifier.
        run_id: Uuid,
        /// 0-indexed position in the pipeline.
        step_index: u32,
        /// 1-indexed attempt number.
        attempt: u32,
        /// The failure message.
        error: String,
        /// When the record was written.
        at: DateTime<Utc>,
    },
    /// The run reached its terminal success.
    RunCompleted {
        /// The run identifier.
        run_id: Uuid,
        /// When the record was written.
        at: DateTime<Utc>,
    },
    /// The run reached a definitive failure.
    RunFailed {
        /// The run identifier.
        run_id: Uuid,
        /// The failure message.
        error: String,
        /// When the record was written.
        at: DateTime<Utc>,
    },
}

impl JournalRecord {
    /// Creates a run-started record stamped now.
    #[must_use]
    pub fn run_started(run_id: Uuid, pipeline: impl Into<String>, input: Value) -> Self {
        Self::RunStarted {
            run_id,
            pipeline: pipeline.into(),
            input,
            at: Utc::now(),
        }
    }

    /// Creates a step-started record stamped now.
    #[must_use]
    pub fn step_started(
        run_id: Uuid,
        step_index: u32,
        step_name: impl Into<String>,
        attempt: u32,
    ) -> Self {
        Self::StepStarted {
            run_id,
            step_index,
            step_name: step_name.into(),
            attempt,
            at: Utc::now(),
        }
    }

    /// Creates a step-completed record stamped now.
    #[must_use]
    pub fn step_completed(run_id: Uuid, step_index: u32, output: Value) -> Self {
        Self::StepCompleted {
            run_id,
            step_index,
            output,
            at: Utc::now(),
        }
    }

    /// Creates a step-failed record stamped now.
    #[must_use]
    pub fn step_failed(
        run_id: Uuid,
        step_index: u32,
        attempt: u32,
        error: impl Into<String>,
    ) -> Self {
        Self::StepFailed {
            run_id,
            step_index,
            attempt,
            error: error.into(),
            at: Utc::now(),
        }
    }

    /// Creates a run-completed record stamped now.
    #[must_use]
    pub fn run_completed(run_id: Uuid) -> Self {
        Self::RunCompleted {
            run_id,
            at: Utc::now(),
        }
    }

    /// Creates a run-failed record stamped now.
    #[must_use]
    pub fn run_failed(run_id: Uuid, error: impl Into<String>) -> Self {
        Self::RunFailed {
            run_id,
            error: error.into(),
            at: Utc::now(),
        }
    }

    /// The run this record belongs to.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StepStarted { run_id, .. }
            | Self::StepCompleted { run_id, .. }
            | Self::StepFailed { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Records run and step events for durability and replay.
#[async_trait]
pub trait RunJournal: Send + Sync {
    /// Appends one record.
    async fn record(&self, record: JournalRecord) -> Result<(), JournalError>;

    /// Output of the completed step at `step_index` for `run_id`, if any.
    async fn completed_output(
        &self,
        run_id: Uuid,
        step_index: u32,
    ) -> Result<Option<Value>, JournalError>;

    /// Runs with a start record but no terminal record, paired with their
    /// original input.
    async fn incomplete_runs(&self) -> Result<Vec<(Uuid, Value)>, JournalError>;
}

/// In-memory journal backed by a concurrent map of per-run record logs.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    runs: DashMap<Uuid, Vec<JournalRecord>>,
}

impl MemoryJournal {
    /// Creates an empty in-memory journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record synchronously.
    pub fn insert(&self, record: JournalRecord) {
        self.runs.entry(record.run_id()).or_default().push(record);
    }

    /// All records for one run, in append order.
    #[must_use]
    pub fn records_for(&self, run_id: Uuid) -> Vec<JournalRecord> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of started attempts journaled for one step of one run.
    #[must_use]
    pub fn attempts_for(&self, run_id: Uuid, step_index: u32) -> u32 {
        self.records_for(run_id)
            .iter()
            .filter(|record| {
                matches!(
                    record,
                    JournalRecord::StepStarted { step_index: index, .. } if *index == step_index
                )
            })
            .count() as u32
    }

    fn completed_output_sync(&self, run_id: Uuid, step_index: u32) -> Option<Value> {
        self.runs.get(&run_id).and_then(|records| {
            records.iter().rev().find_map(|record| match record {
                JournalRecord::StepCompleted {
                    step_index: index,
                    output,
                    ..
                } if *index == step_index => Some(output.clone()),
                _ => None,
            })
        })
    }

    fn incomplete_runs_sync(&self) -> Vec<(Uuid, Value)> {
        self.runs
            .iter()
            .filter_map(|entry| {
                let records = entry.value();
                let terminal = records.iter().any(|record| {
                    matches!(
                        record,
                        JournalRecord::RunCompleted { .. } | JournalRecord::RunFailed { .. }
                    )
                });
                if terminal {
                    return None;
                }
                records.iter().find_map(|record| match record {
                    JournalRecord::RunStarted { run_id, input, .. } => {
                        Some((*run_id, input.clone()))
                    }
                    _ => None,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RunJournal for MemoryJournal {
    async fn record(&self, record: JournalRecord) -> Result<(), JournalError> {
        self.insert(record);
        Ok(())
    }

    async fn completed_output(
        &self,
        run_id: Uuid,
        step_index: u32,
    ) -> Result<Option<Value>, JournalError> {
        Ok(self.completed_output_sync(run_id, step_index))
    }

    async fn incomplete_runs(&self) -> Result<Vec<(Uuid, Value)>, JournalError> {
        Ok(self.incomplete_runs_sync())
    }
}

/// Append-only JSON-lines journal that survives process restarts.
///
/// State is rebuilt by scanning the file on open; writes are flushed per
/// record so a crash loses at most the record being written.
pub struct FileJournal {
    memory: MemoryJournal,
    file: Mutex<File>,
    path: PathBuf,
}

impl FileJournal {
    /// Opens (or creates) the journal at `path` and rebuilds its state.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let memory = MemoryJournal::new();

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            for line in raw.lines().filter(|line| !line.trim().is_empty()) {
                let record: JournalRecord = serde_json::from_str(line)?;
                memory.insert(record);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            memory,
            file: Mutex::new(file),
            path,
        })
    }

    /// The journal file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJournal")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl RunJournal for FileJournal {
    async fn record(&self, record: JournalRecord) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        {
            let mut file = self.file.lock();
            file.write_all(line.as_bytes())?;
            file.flush()?;
        }
        self.memory.insert(record);
        Ok(())
    }

    async fn completed_output(
        &self,
        run_id: Uuid,
        step_index: u32,
    ) -> Result<Option<Value>, JournalError> {
        Ok(self.memory.completed_output_sync(run_id, step_index))
    }

    async fn incomplete_runs(&self) -> Result<Vec<(Uuid, Value)>, JournalError> {
        Ok(self.memory.incomplete_runs_sync())
    }
}

/// A journal that discards everything. Durability opt-out.
#[derive(Debug, Clone, Default)]
pub struct NoopJournal;

impl NoopJournal {
    /// Creates a no-op journal.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RunJournal for NoopJournal {
    async fn record(&self, _record: JournalRecord) -> Result<(), JournalError> {
        Ok(())
    }

    async fn completed_output(
        &self,
        _run_id: Uuid,
        _step_index: u32,
    ) -> Result<Option<Value>, JournalError> {
        Ok(None)
    }

    async fn incomplete_runs(&self) -> Result<Vec<(Uuid, Value)>, JournalError> {
        Ok(Vec::new())
    }
}
