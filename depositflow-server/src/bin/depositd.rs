//! Combined deployment topology: HTTP listener and executor in one process.
//!
//! Usage: `depositd [config-path]` (defaults to `./development.yaml`).

use uuid::Uuid;

use depositflow_server::{bootstrap, config, AppState, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "development.yaml".to_string());
    let config = config::load(&path)?;

    let identity = Uuid::new_v4();
    tracing::info!(%identity, namespace = %config.service.namespace, "starting deposit service");

    let executor = bootstrap::build_executor(&config)?;

    // Drive runs interrupted by a previous crash to a terminal result
    // before accepting new traffic.
    let summary = bootstrap::replay_incomplete(&executor).await?;
    if summary.replayed + summary.failed > 0 {
        tracing::info!(
            replayed = summary.replayed,
            failed = summary.failed,
            "recovery pass finished"
        );
    }

    let state = AppState::new(executor, identity, config.service.namespace.clone());
    Server::new(state).run(&config.server.listen).await
}
