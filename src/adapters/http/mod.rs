//! Trigger Server - axum 0.7 HTTP Surface
//!
//! Routes:
//! - `GET /api/cron/finalize-no-disputes`
//! - `GET /api/cron/cancel-no-proposal`
//! - `GET /live`, `GET /ready`, `GET /metrics`
//!
//! Job failures map to HTTP statuses: bad credentials 401, a run
//! already in progress 409, upstream failures 500 naming the step.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::adapters::metrics::{HealthState, ReconcilerMetrics};
use crate::domain::error::JobError;
use crate::domain::job::JobKind;
use crate::domain::outcome::JobSummary;
use crate::usecases::JobRunner;

/// Shared state behind every route.
pub struct AppState {
    pub runner: JobRunner,
    pub metrics: Arc<ReconcilerMetrics>,
    pub health: HealthState,
}

/// Body returned when a run aborts.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub step: &'static str,
    pub error: String,
}

/// Trigger path for a job.
pub fn route_for(kind: JobKind) -> String {
    format!("/api/cron/{}", kind.name())
}

/// Build the router with all trigger, probe and metrics routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&route_for(JobKind::Finalize), get(finalize_no_disputes))
        .route(&route_for(JobKind::Cancel), get(cancel_no_proposal))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
#[instrument(skip(state, shutdown))]
pub async fn serve<S>(state: Arc<AppState>, bind_address: &str, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "Trigger server started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// HTTP status for a job-level failure.
pub const fn status_for(error: &JobError) -> StatusCode {
    match error {
        JobError::Auth => StatusCode::UNAUTHORIZED,
        JobError::LeaseHeld { .. } => StatusCode::CONFLICT,
        JobError::UpstreamQuery { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a run result as the trigger response.
pub fn job_response(result: Result<JobSummary, JobError>) -> Response {
    match result {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            let body = ErrorBody {
                ok: false,
                step: e.step(),
                error: format!("{e}"),
            };
            (status_for(&e), Json(body)).into_response()
        }
    }
}

async fn run_job(state: &AppState, kind: JobKind, headers: &HeaderMap) -> Response {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    job_response(state.runner.run(kind, authorization).await)
}

async fn finalize_no_disputes(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    run_job(&state, JobKind::Finalize, &headers).await
}

async fn cancel_no_proposal(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    run_job(&state, JobKind::Cancel, &headers).await
}

async fn liveness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.health.liveness()
}

async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.health.readiness()
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
