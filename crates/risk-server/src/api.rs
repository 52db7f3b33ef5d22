//! HTTP API: input form, prediction endpoints, model management, health and metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use risk_lib::{
    health::{ComponentStatus, HealthRegistry},
    input::subject_from_form,
    store::CachedModelInfo,
    ArtifactCoverage, ArtifactFormat, ArtifactStore, DispatchError, Dispatcher, ErrorResponse,
    FeatureRecord, FeatureValues, PredictRequest, PredictResponse, ResultSet, RiskMetrics,
    SchemaResponse,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::render;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub store: Arc<ArtifactStore>,
    pub health_registry: HealthRegistry,
    pub metrics: RiskMetrics,
}

impl AppState {
    pub fn new(
        dispatcher: Dispatcher,
        store: Arc<ArtifactStore>,
        health_registry: HealthRegistry,
        metrics: RiskMetrics,
    ) -> Self {
        Self {
            dispatcher,
            store,
            health_registry,
            metrics,
        }
    }

    /// Rescan artifact coverage and push it into the health registry
    async fn record_coverage(&self) -> ArtifactCoverage {
        let coverage = self.dispatcher.coverage();
        self.health_registry.record_coverage(&coverage).await;
        coverage
    }
}

/// Response of `GET /api/v1/models`
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub artifact_format: ArtifactFormat,
    pub available: usize,
    pub total: usize,
    pub coverage: ArtifactCoverage,
    pub cached: Vec<CachedModelInfo>,
}

/// Response of `POST /api/v1/models/refresh`
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub invalidated: usize,
    pub cached: usize,
}

/// Request failures that map to a non-200 response
#[derive(Debug)]
pub enum ApiError {
    Dispatch(DispatchError),
    Internal(String),
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        ApiError::Dispatch(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Dispatch(e) => {
                let body = ErrorResponse {
                    error: e.to_string(),
                    missing: e.missing().to_vec(),
                };
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            ApiError::Internal(message) => {
                error!(error = %message, "Request failed");
                let body = ErrorResponse {
                    error: message,
                    missing: Vec::new(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

/// Classifiers are synchronous, so the dispatch runs off the async executor.
async fn dispatch(state: &AppState, values: FeatureValues) -> Result<ResultSet, ApiError> {
    let dispatcher = state.dispatcher.clone();
    let results = tokio::task::spawn_blocking(move || dispatcher.predict(&values))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task failed: {e}")))??;
    state.metrics.set_cached_models(state.store.cached_len() as i64);
    Ok(results)
}

/// Input form
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render::form(state.dispatcher.schema().features()))
}

/// Form submission, answered with the result page
async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let schema = state.dispatcher.schema();
    let parsed = FeatureRecord::from_form(schema, &fields)
        .and_then(|record| Ok((record, subject_from_form(&fields)?)));

    let (record, subject) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            state.metrics.inc_rejected_requests();
            return (StatusCode::BAD_REQUEST, Html(render::error(&e.to_string()))).into_response();
        }
    };

    match dispatch(&state, record.into_values()).await {
        Ok(results) => Html(render::results(subject.as_ref(), &results)).into_response(),
        Err(ApiError::Dispatch(e)) => {
            (StatusCode::BAD_REQUEST, Html(render::error(&e.to_string()))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn schema(State(state): State<Arc<AppState>>) -> Json<SchemaResponse> {
    let schema = state.dispatcher.schema();
    Json(SchemaResponse {
        targets: schema.targets().to_vec(),
        features: schema.features().to_vec(),
        families: state.dispatcher.families().to_vec(),
    })
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let results = dispatch(&state, request.features).await?;
    Ok(Json(PredictResponse {
        subject: request.subject,
        results,
    }))
}

async fn models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let coverage = state.record_coverage().await;
    Json(ModelsResponse {
        artifact_format: state.dispatcher.resolver().format(),
        available: coverage.available(),
        total: coverage.total(),
        coverage,
        cached: state.store.cached(),
    })
}

/// Drop cached classifiers whose artifact changed or disappeared
async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>, ApiError> {
    let store = state.store.clone();
    let invalidated = tokio::task::spawn_blocking(move || store.refresh())
        .await
        .map_err(|e| ApiError::Internal(format!("refresh task failed: {e}")))?;
    state.record_coverage().await;

    let cached = state.store.cached_len();
    state.metrics.set_cached_models(cached as i64);
    info!(invalidated, cached, "Model cache refreshed via API");

    Ok(Json(RefreshResponse {
        invalidated,
        cached,
    }))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.record_coverage().await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // missing cells report "not available"
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return ApiError::Internal(format!("failed to encode metrics: {e}")).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit_form))
        .route("/api/v1/schema", get(schema))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/models", get(models))
        .route("/api/v1/models/refresh", post(refresh))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
