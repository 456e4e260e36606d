//! HTTP boundary for the deposit pipeline.
//!
//! This crate owns everything the core executor treats as an external
//! collaborator: the axum listener, YAML configuration loading, and the
//! thin composition roots for each deployment topology.
//!
//! # Endpoints
//!
//! - `POST /deposits` — run the pipeline, await the terminal deposit
//! - `POST /deposits/async` — start the run, return 202 with the run id
//! - `GET /deposits` — all recorded deposits in completion order
//! - `GET /deposits/{id}` — lookup by run id or deposit id
//! - `GET /health` — liveness

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// The deposit HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Creates a server over pre-built application state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Builds the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route(
                "/deposits",
                post(routes::create_deposit).get(routes::list_deposits),
            )
            .route("/deposits/async", post(routes::submit_deposit))
            .route("/deposits/:id", get(routes::get_deposit))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Binds the listener and serves until an interrupt arrives.
    pub async fn run(self, listen: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(listen).await?;
        tracing::info!(%listen, identity = %self.state.identity, "listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use depositflow::domain::{Deposit, DepositRequest};
    use depositflow::journal::MemoryJournal;
    use depositflow::retry::RetryPolicy;
    use depositflow::steps::deposit_executor;
    use depositflow::store::MemoryResultStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_router() -> Router {
        let executor = Arc::new(deposit_executor(
            RetryPolicy::new().with_initial_interval(Duration::from_millis(1)),
            Arc::new(MemoryJournal::new()),
            Arc::new(MemoryResultStore::new()),
        ));
        let state = AppState::new(executor, Uuid::new_v4(), "default".to_string());
        Server::new(state).router()
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let health: routes::HealthResponse = body_json(response).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.namespace, "default");
    }

    #[tokio::test]
    async fn test_create_deposit_returns_record() {
        let response = test_router()
            .oneshot(json_post("/deposits", r#"{"UserID":"u1","Amount":100}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let deposit: Deposit = body_json(response).await;
        assert_eq!(deposit.user_id, "u1");
        assert_eq!(deposit.amount, 100);
    }

    #[tokio::test]
    async fn test_create_deposit_rejects_malformed_body() {
        let response = test_router()
            .oneshot(json_post("/deposits", "{not json"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_deposit_rejects_invalid_amount() {
        let response = test_router()
            .oneshot(json_post("/deposits", r#"{"UserID":"u1","Amount":-5}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_async_submit_returns_accepted() {
        let router = test_router();
        let response = router
            .clone()
            .oneshot(json_post("/deposits/async", r#"{"UserID":"u2","Amount":7}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let submission: routes::RunSubmission = body_json(response).await;

        // Poll until the spawned run lands in the store.
        let mut found = None;
        for _ in 0..50 {
            let response = router
                .clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/deposits/{}", submission.run_id))
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response");
            if response.status() == StatusCode::OK {
                found = Some(body_json::<Deposit>(response).await);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let deposit = found.expect("run completed");
        assert_eq!(deposit.run_id, submission.run_id);
        assert_eq!(deposit.user_id, "u2");
    }

    #[tokio::test]
    async fn test_list_returns_all_deposits() {
        let router = test_router();
        for amount in [1, 2, 3] {
            let body = serde_json::to_string(&DepositRequest::new("u1", amount)).expect("body");
            let response = router
                .clone()
                .oneshot(json_post("/deposits", &body))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/deposits")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let deposits: Vec<Deposit> = body_json(response).await;
        let amounts: Vec<i64> = deposits.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri(format!("/deposits/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
