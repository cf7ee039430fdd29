//! HTTP surface for the forensic analysis pipeline
//!
//! `POST /api/analyze` starts a run on a background task; `GET /api/progress`
//! streams its events as server-sent events.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Forensics Studio API",
        version = "0.1.0",
        description = "API for Forensics Studio - multi-agent image authenticity analysis"
    ),
    paths(
        routes::health_check,
        routes::start_analysis,
        routes::sse::progress_stream,
    ),
    components(schemas(
        routes::HealthResponse,
        routes::AnalyzeRequest,
        routes::AnalyzeResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "analysis", description = "Analysis runs and their progress stream (SSE)"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let app_dir = state.app_dir.clone();

    let api_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health_check))
        .route("/api/analyze", post(routes::start_analysis))
        .route("/api/progress", get(routes::sse::progress_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    if let Some(app_dir) = app_dir {
        let index_file = app_dir.join("index.html");
        let serve_dir = ServeDir::new(&app_dir).not_found_service(ServeFile::new(&index_file));
        api_router.fallback_service(serve_dir)
    } else {
        api_router
    }
}

/// Bind `port` on all interfaces and serve until the process is stopped
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
