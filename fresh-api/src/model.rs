use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use fresh_engine::RetrainSummary;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub preprocessor_loaded: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub model_type: String,
    pub model_loaded: bool,
    pub preprocessor_loaded: bool,
    pub feature_names: Vec<String>,
    pub total_features: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/model-info", get(model_info))
        .route("/retrain", post(retrain))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let bundle = state.registry().current();

    Json(HealthResponse {
        status: "healthy",
        model_loaded: bundle.is_some(),
        preprocessor_loaded: bundle.as_ref().is_some_and(|b| b.has_preprocessor()),
        timestamp: Utc::now(),
    })
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let response = match state.registry().current() {
        Some(bundle) => ModelInfoResponse {
            model_type: bundle.model.model_type().to_string(),
            model_loaded: true,
            preprocessor_loaded: bundle.has_preprocessor(),
            total_features: bundle.feature_names.len(),
            feature_names: bundle.feature_names.clone(),
        },
        None => ModelInfoResponse {
            model_type: "None".to_string(),
            model_loaded: false,
            preprocessor_loaded: false,
            feature_names: Vec::new(),
            total_features: 0,
        },
    };

    Json(response)
}

/// POST /retrain
/// Trains off the async runtime, then swaps the new model in
pub async fn retrain(State(state): State<AppState>) -> Result<Json<RetrainSummary>, AppError> {
    let lifecycle = state.lifecycle.clone();
    let summary = tokio::task::spawn_blocking(move || lifecycle.retrain()).await??;

    Ok(Json(summary))
}
