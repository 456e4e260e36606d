//! Shared application state.

use std::sync::Arc;
use uuid::Uuid;

use depositflow::steps::DepositExecutor;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline executor; one spawned run per accepted request.
    pub executor: Arc<DepositExecutor>,
    /// Fresh process identity, generated at startup.
    pub identity: Uuid,
    /// Logical namespace this process serves.
    pub namespace: String,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub fn new(executor: Arc<DepositExecutor>, identity: Uuid, namespace: String) -> Self {
        Self {
            executor,
            identity,
            namespace,
        }
    }
}
