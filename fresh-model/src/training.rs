use crate::dataset::TrainingSample;
use crate::features::{FeatureError, FeaturePreprocessor};
use crate::gbt::{BoostingParams, GradientBoostedTrees};
use crate::model::{ModelBundle, ModelError, PriceModel};
use fresh_shared::SnapshotError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const TOP_IMPORTANCES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Training dataset is empty")]
    EmptyDataset,

    #[error("Got {rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Row {row} has {actual} features, expected {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },

    #[error("Invalid training parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid training sample: {0}")]
    InvalidSample(#[from] SnapshotError),

    #[error("Feature encoding failed: {0}")]
    Features(#[from] FeatureError),

    #[error("Model evaluation failed: {0}")]
    Evaluation(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub split_seed: u64,
    pub boosting: BoostingParams,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            boosting: BoostingParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Self {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
            };
        }

        let (actual, predicted) = (&actual[..n], &predicted[..n]);
        let mean = actual.iter().sum::<f64>() / n as f64;

        let mut abs_error = 0.0;
        let mut sq_error = 0.0;
        let mut total = 0.0;
        for (y, p) in actual.iter().zip(predicted) {
            abs_error += (y - p).abs();
            sq_error += (y - p).powi(2);
            total += (y - mean).powi(2);
        }

        Self {
            mae: abs_error / n as f64,
            rmse: (sq_error / n as f64).sqrt(),
            r2: if total > 0.0 { 1.0 - sq_error / total } else { 0.0 },
        }
    }
}

/// Output of a training run, with the concrete model kept for persistence
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: GradientBoostedTrees,
    pub preprocessor: FeaturePreprocessor,
    pub feature_names: Vec<String>,
    pub train_metrics: RegressionMetrics,
    pub test_metrics: RegressionMetrics,
    pub samples: usize,
}

impl TrainedModel {
    pub fn into_bundle(self) -> ModelBundle {
        ModelBundle::new(Arc::new(self.model), Some(self.preprocessor), self.feature_names)
    }
}

/// Fit the preprocessor and the boosted trees on a labelled dataset
pub fn train_model(dataset: &[TrainingSample], params: &TrainingParams) -> Result<TrainedModel, TrainingError> {
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if !(0.0..1.0).contains(&params.test_fraction) {
        return Err(TrainingError::InvalidParams(format!(
            "test_fraction must be in [0, 1), got {}",
            params.test_fraction
        )));
    }

    let snapshots: Vec<_> = dataset.iter().map(|s| s.snapshot.clone()).collect();
    let preprocessor = FeaturePreprocessor::fit(&snapshots)?;
    let feature_names = preprocessor.feature_names();

    let features = snapshots
        .iter()
        .map(|s| preprocessor.transform(s))
        .collect::<Result<Vec<_>, _>>()?;
    let targets: Vec<f64> = dataset.iter().map(|s| s.target_price).collect();

    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(params.split_seed));

    let test_len = (dataset.len() as f64 * params.test_fraction).round() as usize;
    // keep at least one training row
    let test_len = test_len.min(dataset.len() - 1);
    let (test_idx, train_idx) = indices.split_at(test_len);

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter().map(|&i| (features[i].clone(), targets[i])).unzip()
    };
    let (x_train, y_train) = pick(train_idx);
    let (x_test, y_test) = pick(test_idx);

    info!(
        "Training {} on {} rows ({} held out, {} features)",
        GradientBoostedTrees::MODEL_TYPE,
        x_train.len(),
        x_test.len(),
        feature_names.len()
    );

    let model = GradientBoostedTrees::fit(&x_train, &y_train, &params.boosting)?;

    let train_metrics = evaluate(&model, &x_train, &y_train)?;
    let test_metrics = evaluate(&model, &x_test, &y_test)?;

    info!(
        "Train MAE: {:.4}, RMSE: {:.4}, R2: {:.4}",
        train_metrics.mae, train_metrics.rmse, train_metrics.r2
    );
    info!(
        "Test MAE: {:.4}, RMSE: {:.4}, R2: {:.4}",
        test_metrics.mae, test_metrics.rmse, test_metrics.r2
    );

    let mut ranked: Vec<(&String, f64)> = feature_names
        .iter()
        .zip(model.feature_importances().iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (name, importance) in ranked.iter().take(TOP_IMPORTANCES) {
        info!("  {}: {:.4}", name, importance);
    }

    Ok(TrainedModel {
        model,
        preprocessor,
        feature_names,
        train_metrics,
        test_metrics,
        samples: dataset.len(),
    })
}

fn evaluate(
    model: &GradientBoostedTrees,
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<RegressionMetrics, TrainingError> {
    let predictions = features
        .iter()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RegressionMetrics::compute(targets, &predictions))
}
