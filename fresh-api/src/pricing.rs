use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use fresh_engine::BatchError;
use fresh_shared::{BatchPredictionResult, PredictionResult, ProductData, ProductSnapshot};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub products: Vec<ProductData>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/predict-price", post(predict_price))
        .route("/batch-predict", post(batch_predict))
}

/// POST /predict-price
pub async fn predict_price(
    State(state): State<AppState>,
    payload: Result<Json<ProductData>, JsonRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    let Json(data) = payload.map_err(AppError::from_rejection)?;
    let snapshot = ProductSnapshot::try_from(data).map_err(|e| AppError::ValidationError(e.to_string()))?;

    Ok(Json(state.predictor.predict(&snapshot)))
}

/// POST /batch-predict
/// Every product is validated before any is priced
pub async fn batch_predict(
    State(state): State<AppState>,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> Result<Json<BatchPredictionResult>, AppError> {
    let Json(request) = payload.map_err(AppError::from_rejection)?;

    let snapshots = request
        .products
        .into_iter()
        .enumerate()
        .map(|(i, data)| {
            ProductSnapshot::try_from(data).map_err(|e| AppError::ValidationError(format!("products[{}]: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = state
        .batch
        .predict_batch(&state.predictor, &snapshots)
        .map_err(|e| match e {
            BatchError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
        })?;

    Ok(Json(result))
}
