use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use middag_core::pipeline::{Pipeline, PlanRequest, PlanResponse};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/plan-meals", post(plan_meals))
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pipeline: Arc<Pipeline>, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pipeline);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("middag serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("middag serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl+C handler");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Run one planning request. Stage failures surface as partial or empty
/// fields in the response body, never as HTTP errors.
async fn plan_meals(
    State(pipeline): State<Arc<Pipeline>>,
    Json(request): Json<PlanRequest>,
) -> Json<PlanResponse> {
    let run = pipeline.run(request).await;
    Json(run.response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
