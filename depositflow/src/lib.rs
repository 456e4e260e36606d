//! # Depositflow
//!
//! A durable multi-step pipeline executor for deposit processing.
//!
//! Depositflow drives a deposit request through a fixed three-step pipeline
//! (transaction creation, wallet creation, deposit creation) and records the
//! terminal deposit in an append-only result store. It provides:
//!
//! - **Typed step composition**: the compiler enforces that each step's
//!   output matches the next step's input
//! - **Per-step retries**: exponential backoff with a hard attempt ceiling
//! - **Durable execution**: a write-ahead journal of step outcomes lets a
//!   restarted process resume a run past already-completed steps
//! - **Cooperative cancellation**: backoff waits abort promptly when the
//!   run's token is cancelled
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use depositflow::prelude::*;
//! use std::sync::Arc;
//!
//! let executor = Executor::new(
//!     Arc::new(deposit_pipeline()),
//!     RetryPolicy::default(),
//!     Arc::new(MemoryJournal::new()),
//!     Arc::new(MemoryResultStore::new()),
//! );
//!
//! let token = CancelToken::new();
//! let deposit = executor
//!     .execute(&token, Uuid::new_v4(), DepositRequest::new("u1", 100))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod journal;
pub mod pipeline;
pub mod retry;
pub mod step;
pub mod steps;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancelToken;
    pub use crate::domain::{Deposit, DepositRequest, Transaction, Wallet};
    pub use crate::errors::ExecuteError;
    pub use crate::executor::Executor;
    pub use crate::journal::{
        FileJournal, JournalRecord, MemoryJournal, NoopJournal, RunJournal,
    };
    pub use crate::pipeline::Pipeline;
    pub use crate::retry::RetryPolicy;
    pub use crate::step::{Step, StepContext, StepError, ValidationError};
    pub use crate::steps::{deposit_pipeline, DepositExecutor};
    pub use crate::store::{MemoryResultStore, ResultStore, TerminalRecord};
    pub use uuid::Uuid;
}
