//! HTTP route handlers.

mod deposits;
mod health;

pub use deposits::{create_deposit, get_deposit, list_deposits, submit_deposit, RunSubmission};
pub use health::{health, HealthResponse};
