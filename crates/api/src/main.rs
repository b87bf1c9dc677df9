use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use pipeline::{ConfigUpdate, Metrics, MetricsSnapshot, Pipeline, PipelineConfig};
use report::RunReport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

struct AppState {
    config: RwLock<PipelineConfig>,
    metrics: Arc<Metrics>,
    // Folder runs are processed one at a time
    run_lock: Mutex<()>,
}

impl AppState {
    fn new(config: PipelineConfig) -> Self {
        Self {
            config: RwLock::new(config),
            metrics: Metrics::new(),
            run_lock: Mutex::new(()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    model: String,
}

#[derive(Deserialize)]
struct ProcessRequest {
    /// Folder containing the PDFs
    input: String,
    /// Optional folder for the JSON and Markdown reports
    output: Option<String>,
}

#[derive(Serialize)]
struct ProcessResponse {
    report: RunReport,
    reports: Option<ReportPaths>,
}

#[derive(Serialize)]
struct ReportPaths {
    json: String,
    markdown: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn internal(e: anyhow::Error) -> ApiError {
    error!(error = %e, "Request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pipeline::init_tracing("info,tower_http=debug");

    let config = PipelineConfig::from_env()?;
    info!(model = %config.llm.model, language = %config.language, "Configuration loaded");

    let state = Arc::new(AppState::new(config));

    let addr = std::env::var("API_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server listening on http://{addr}");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/config", get(get_config).put(update_config))
        .route("/process", post(process_folder))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = state.config.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        model: config.llm.model.clone(),
    })
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<PipelineConfig> {
    Json(state.config.read().await.clone())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<PipelineConfig> {
    let mut config = state.config.write().await;
    config
        .apply(update)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    info!(
        model = %config.llm.model,
        chunk_size = config.chunking.chunk_size,
        keep_closed = config.keep_closed,
        "Configuration updated"
    );
    Ok(Json(config.clone()))
}

async fn process_folder(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> ApiResult<ProcessResponse> {
    let input = PathBuf::from(&req.input);
    if !input.is_dir() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Input folder not found: {}", req.input),
        ));
    }

    let _run = state.run_lock.lock().await;

    // Each run works on a snapshot; edits made meanwhile apply to the next run
    let config = state.config.read().await.clone();
    let model = config.build_model().map_err(internal)?;
    let pipeline = Pipeline::new(model, &config, state.metrics.clone())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let report = pipeline
        .process_folder(&input)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("No PDF files found in {}", req.input),
            )
        })?;

    let reports = match req.output {
        Some(output) => {
            let written = report::write_reports(&report, Path::new(&output))
                .await
                .map_err(internal)?;
            Some(ReportPaths {
                json: written.json.display().to_string(),
                markdown: written.markdown.display().to_string(),
            })
        }
        None => None,
    };

    Ok(Json(ProcessResponse { report, reports }))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
