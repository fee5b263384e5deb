//! JSON API for operators
//!
//! - `POST /runs` starts a run (202 with its id, 400 on invalid input)
//! - `GET /jobs` lists live runs
//! - `DELETE /jobs/{run_id}` cancels a run and returns once it has stopped
//! - `GET /health`

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::booking::ReservationCoordinator;
use crate::config::ServerConfig;
use crate::jobs::{JobError, JobRecord, RunId};
use crate::models::{UserCredentials, NO_SECOND_SLOT};

/// Body of `POST /runs`
#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    pub user_id: String,
    pub user_name: String,
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
    pub sport_date: String,
    pub first_time: String,
    #[serde(default = "no_second_slot")]
    pub second_time: String,
    #[serde(default)]
    pub execute_now: bool,
}

fn no_second_slot() -> String {
    NO_SECOND_SLOT.to_string()
}

impl StartRunRequest {
    fn into_credentials(self) -> crate::error::Result<UserCredentials> {
        UserCredentials::from_form(
            &self.user_id,
            &self.user_name,
            &self.password,
            &self.phone_number,
            &self.sport_date,
            &self.first_time,
            &self.second_time,
            self.execute_now,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: RunId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub run_id: RunId,
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

/// Build the router around a coordinator
pub fn router(coordinator: ReservationCoordinator) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/runs", post(start_run_handler))
        .route("/jobs", get(list_jobs_handler))
        .route("/jobs/{run_id}", delete(cancel_job_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(coordinator)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &ServerConfig, coordinator: ReservationCoordinator) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(%addr, "Reservation API listening");

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn health_handler(State(coordinator): State<ReservationCoordinator>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "active_runs": coordinator.registry().len().await,
    }))
}

async fn start_run_handler(
    State(coordinator): State<ReservationCoordinator>,
    Json(request): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<StartRunResponse>), ApiError> {
    let user = request
        .into_credentials()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let run_id = coordinator.start(user).await;
    Ok((StatusCode::ACCEPTED, Json(StartRunResponse { run_id })))
}

async fn list_jobs_handler(State(coordinator): State<ReservationCoordinator>) -> Json<Vec<JobRecord>> {
    Json(coordinator.registry().list().await)
}

async fn cancel_job_handler(
    State(coordinator): State<ReservationCoordinator>,
    Path(run_id): Path<u64>,
) -> Result<Json<CancelResponse>, ApiError> {
    let run_id = RunId(run_id);
    match coordinator.registry().request_cancel(run_id).await {
        Ok(()) => Ok(Json(CancelResponse {
            run_id,
            stopped: true,
        })),
        Err(e @ JobError::NotFound(_)) => Err(api_error(StatusCode::NOT_FOUND, e.to_string())),
    }
}
