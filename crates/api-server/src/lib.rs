//! HTTP API for EnviroLLM
//!
//! A small axum surface over the sensor reader, benchmark orchestrator,
//! store, and comparison engine. Benchmark trials run synchronously inside
//! their handler: the manual sampling endpoint blocks its request for the
//! full window (~30s) by design, and backend batches issue one bounded
//! outbound call per model, sequentially. Backend failures inside a batch
//! become failed records, never HTTP-level failures.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use benchmark_engine::{BenchmarkOrchestrator, ComparisonEngine, ManualBenchmarkRequest};
use benchmark_store::BenchmarkStore;
use common::error::Error;
use common::models::BenchmarkSource;
use common::utils::round1;
use inference_client::{InferenceBackend, OllamaClient, OpenAiCompatClient};
use sensor_monitor::{estimate_power, SensorReader};

/// Shared state handed to every handler
pub struct AppState {
    /// Sensor boundary
    pub sensor_reader: Arc<dyn SensorReader>,

    /// Benchmark coordinator
    pub orchestrator: Arc<BenchmarkOrchestrator>,

    /// Record store
    pub store: Arc<BenchmarkStore>,

    /// Comparison engine
    pub comparison: Arc<ComparisonEngine>,

    /// Client for the local Ollama daemon
    pub ollama: Arc<OllamaClient>,
}

/// Error wrapper mapping `common::Error` onto HTTP statuses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => {
                error!("Request failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Request body for `/benchmark/ollama`
#[derive(Debug, Deserialize)]
pub struct OllamaBenchmarkRequest {
    /// Models to benchmark, one record each
    pub models: Vec<String>,

    /// Prompt to run against every model
    pub prompt: String,

    /// User-supplied quantization label
    #[serde(default = "default_quantization")]
    pub quantization: String,
}

/// Request body for `/benchmark/openai`
#[derive(Debug, Deserialize)]
pub struct OpenAiBenchmarkRequest {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Models to benchmark, one record each
    pub models: Vec<String>,

    /// Prompt to run against every model
    pub prompt: String,

    /// User-supplied quantization label
    #[serde(default = "default_quantization")]
    pub quantization: String,
}

/// Request body for `/benchmarks/compare`
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    /// Record ids to compare
    pub ids: Vec<String>,
}

fn default_quantization() -> String {
    "Unknown".to_string()
}

/// Builds the API router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(get_metrics))
        .route("/system", get(get_system))
        .route("/benchmarks", get(list_benchmarks).delete(clear_benchmarks))
        .route("/benchmarks/export", get(export_benchmarks))
        .route("/benchmarks/compare", post(compare_benchmarks))
        .route("/benchmarks/:id", get(get_benchmark).delete(delete_benchmark))
        .route("/benchmark/start", post(start_manual_benchmark))
        .route("/benchmark/ollama", post(run_ollama_benchmark))
        .route("/benchmark/openai", post(run_openai_benchmark))
        .route("/ollama/models", get(list_ollama_models))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until the process exits
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> common::Result<()> {
    info!("Starting API server on {}", addr);

    axum::Server::bind(&addr)
        .serve(build_router(state).into_make_service())
        .await
        .map_err(|e| Error::Internal(format!("server error: {}", e)))
}

/// `GET /` — liveness banner
async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "EnviroLLM API is running" }))
}

/// `GET /metrics` — one-shot sensor reading with estimated power draw
async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.sensor_reader.read();
    let power = estimate_power(&snapshot);

    Json(json!({
        "timestamp": Utc::now(),
        "cpu_usage": snapshot.cpu_percent,
        "memory_usage": snapshot.memory_percent,
        "power_estimate": round1(power),
        "gpu_info": snapshot.gpu,
    }))
}

/// `GET /system` — static host description
async fn get_system(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "system_specs": state.sensor_reader.system_specs() }))
}

/// `GET /benchmarks` — all stored records, newest first
async fn list_benchmarks(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    let results = state.store.get_all()?;
    Ok(Json(json!({ "results": results })))
}

/// `GET /benchmarks/:id`
async fn get_benchmark(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state.store.get_by_id(&id)?;
    Ok(Json(json!({ "result": record })))
}

/// `DELETE /benchmarks/:id`
async fn delete_benchmark(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.store.delete(&id)? {
        return Err(Error::NotFound(format!("benchmark {}", id)).into());
    }
    Ok(Json(json!({ "status": "success", "deleted": id })))
}

/// `DELETE /benchmarks` — clears the whole history
async fn clear_benchmarks(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = state.store.delete_all()?;
    Ok(Json(json!({ "status": "success", "deleted": deleted })))
}

/// `GET /benchmarks/export` — CSV download with a fixed column order
async fn export_benchmarks(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let csv = state.store.export_csv()?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"benchmarks.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// `POST /benchmarks/compare`
async fn compare_benchmarks(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompareRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let report = state.comparison.compare(&request.ids)?;
    Ok(Json(serde_json::to_value(report).map_err(Error::from)?))
}

/// `POST /benchmark/start` — manual timed trial
///
/// Long-lived synchronous request: blocks for the full sampling window.
async fn start_manual_benchmark(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ManualBenchmarkRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state.orchestrator.run_manual(request).await?;
    Ok(Json(json!({ "status": "completed", "result": record })))
}

/// `POST /benchmark/ollama` — one record per requested model
async fn run_ollama_benchmark(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OllamaBenchmarkRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.models.is_empty() {
        return Err(Error::InvalidArgument("models must not be empty".to_string()).into());
    }

    let records = state
        .orchestrator
        .run_backend(
            state.ollama.as_ref(),
            &request.models,
            &request.prompt,
            &request.quantization,
            BenchmarkSource::Ollama,
        )
        .await?;

    Ok(Json(json!({ "status": "completed", "results": records })))
}

/// `POST /benchmark/openai` — one record per requested model
async fn run_openai_benchmark(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenAiBenchmarkRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.models.is_empty() {
        return Err(Error::InvalidArgument("models must not be empty".to_string()).into());
    }

    let backend = OpenAiCompatClient::new(request.base_url, request.api_key)?;
    let records = state
        .orchestrator
        .run_backend(
            &backend,
            &request.models,
            &request.prompt,
            &request.quantization,
            BenchmarkSource::OpenAiCompatible,
        )
        .await?;

    Ok(Json(json!({ "status": "completed", "results": records })))
}

/// `GET /ollama/models` — daemon availability and installed models
///
/// The probe swallows errors: an unreachable daemon reports
/// `available: false` with an empty list, not an HTTP failure.
async fn list_ollama_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let available = state.ollama.is_available().await;
    let models = if available {
        state.ollama.list_models().await.unwrap_or_default()
    } else {
        Vec::new()
    };

    Json(json!({ "available": available, "models": models }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let not_found = ApiError(Error::NotFound("benchmark x".into())).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad_request =
            ApiError(Error::InvalidArgument("models must not be empty".into())).into_response();
        assert_eq!(bad_request.status(), StatusCode::BAD_REQUEST);

        let storage = ApiError(Error::Storage("disk full".into())).into_response();
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_compare_request_parses() {
        let request: CompareRequest =
            serde_json::from_str(r#"{"ids": ["a", "b"]}"#).unwrap();
        assert_eq!(request.ids, vec!["a", "b"]);
    }

    #[test]
    fn test_openai_request_defaults() {
        let request: OpenAiBenchmarkRequest = serde_json::from_str(
            r#"{"base_url": "http://localhost:8000/v1", "models": ["m"], "prompt": "p"}"#,
        )
        .unwrap();
        assert!(request.api_key.is_none());
        assert_eq!(request.quantization, "Unknown");
    }
}
