use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    version: String,
    /// Analyzer names in execution order
    steps: Vec<String>,
    /// Run whose events the progress stream currently delivers
    active_run: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check with the configured pipeline", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        steps: state
            .pipeline
            .step_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        active_run: state.progress.active_run(),
    })
}
