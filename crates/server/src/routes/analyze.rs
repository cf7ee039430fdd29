use std::path::Path;

use axum::extract::State;
use axum::Json;
use forensics_core::TaskInput;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AnalyzeRequest {
    /// Local file path or http(s) URL of the image
    pub image_path: String,
    /// Caption or context posted with the image
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AnalyzeResponse {
    pub status: String,
    pub message: String,
    pub run_id: Uuid,
}

/// Start a pipeline run. Progress is delivered on `/api/progress`.
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis started", body = AnalyzeResponse),
        (status = 400, description = "Missing or unreachable image", body = crate::error::ErrorResponse)
    ),
    tag = "analysis"
)]
pub async fn start_analysis(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let input = TaskInput::new(payload.image_path, payload.text)?;

    if !input.is_remote() && !Path::new(&input.image_ref).is_file() {
        return Err(AppError::BadRequest(format!(
            "Image not found: {}",
            input.image_ref
        )));
    }

    let run = state
        .pipeline
        .start(&state.progress, input.image_ref, input.text)
        .await;

    tracing::info!(run_id = %run.run_id, "Analysis started");

    Ok(Json(AnalyzeResponse {
        status: "started".to_string(),
        message: "Analysis started".to_string(),
        run_id: run.run_id,
    }))
}
