//! Deposit endpoints.
//!
//! The request body is read raw and decoded by hand so that any malformed
//! payload maps to a 400, mirroring the upstream service's behavior.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use depositflow::cancellation::CancelToken;
use depositflow::domain::{Deposit, DepositRequest};
use depositflow::store::ResultStore;

use crate::error::ApiError;
use crate::state::AppState;

/// Response to an async submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSubmission {
    /// Identifier the caller can poll for the terminal result.
    #[serde(rename = "RunID")]
    pub run_id: Uuid,
}

fn decode_request(body: &str) -> Result<DepositRequest, ApiError> {
    serde_json::from_str(body).map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// `POST /deposits` — runs the pipeline and awaits the terminal result.
pub async fn create_deposit(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Deposit>, ApiError> {
    let request = decode_request(&body)?;
    let run_id = Uuid::new_v4();
    let token = CancelToken::new();

    let deposit = state.executor.execute(&token, run_id, request).await?;
    Ok(Json(deposit))
}

/// `POST /deposits/async` — starts the run and returns 202 immediately.
///
/// The caller polls the list/get endpoints to observe completion.
pub async fn submit_deposit(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<RunSubmission>), ApiError> {
    let request = decode_request(&body)?;
    let run_id = Uuid::new_v4();

    let executor = state.executor.clone();
    tokio::spawn(async move {
        let token = CancelToken::new();
        if let Err(err) = executor.execute(&token, run_id, request).await {
            tracing::warn!(%run_id, error = %err, "async run failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(RunSubmission { run_id })))
}

/// `GET /deposits` — full store contents in completion order.
pub async fn list_deposits(State(state): State<AppState>) -> Json<Vec<Deposit>> {
    Json(state.executor.store().list())
}

/// `GET /deposits/{id}` — lookup by run id or deposit id.
pub async fn get_deposit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deposit>, ApiError> {
    state
        .executor
        .store()
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no deposit for {id}")))
}
