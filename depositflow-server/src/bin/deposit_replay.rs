//! Recovery deployment topology: drain the journal's incomplete runs and
//! exit. Useful as a one-shot job after an unclean shutdown.
//!
//! Usage: `deposit-replay [config-path]` (defaults to `./development.yaml`).

use depositflow_server::{bootstrap, config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "development.yaml".to_string());
    let config = config::load(&path)?;

    let executor = bootstrap::build_executor(&config)?;
    let summary = bootstrap::replay_incomplete(&executor).await?;

    tracing::info!(
        replayed = summary.replayed,
        failed = summary.failed,
        "recovery pass finished"
    );
    Ok(())
}
