use crate::features::{encode, FeatureError, FeaturePreprocessor};
use fresh_shared::ProductSnapshot;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Model produced a non-finite prediction: {0}")]
    NonFinite(f64),

    #[error("Data preprocessing error: {0}")]
    Preprocessing(#[from] FeatureError),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Interface for a trained price regressor
pub trait PriceModel: Send + Sync {
    /// Predict a price from an encoded feature vector
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Human-readable model family
    fn model_type(&self) -> &str;

    /// Length of the feature vector the model was trained on
    fn n_features(&self) -> usize;
}

/// Everything needed to score a snapshot with a trained model.
///
/// The three parts are always replaced together so a reader never pairs a
/// model with a preprocessor it was not trained with.
#[derive(Clone)]
pub struct ModelBundle {
    pub model: Arc<dyn PriceModel>,
    pub preprocessor: Option<FeaturePreprocessor>,
    pub feature_names: Vec<String>,
}

impl ModelBundle {
    pub fn new(
        model: Arc<dyn PriceModel>,
        preprocessor: Option<FeaturePreprocessor>,
        feature_names: Vec<String>,
    ) -> Self {
        Self {
            model,
            preprocessor,
            feature_names,
        }
    }

    pub fn has_preprocessor(&self) -> bool {
        self.preprocessor.is_some()
    }

    /// Encode the snapshot and run raw inference
    pub fn predict(&self, snapshot: &ProductSnapshot) -> Result<f64, ModelError> {
        let features = encode(self.preprocessor.as_ref(), snapshot)?;
        let prediction = self.model.predict(&features)?;

        if !prediction.is_finite() {
            return Err(ModelError::NonFinite(prediction));
        }

        Ok(prediction)
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("model_type", &self.model.model_type())
            .field("preprocessor", &self.preprocessor.is_some())
            .field("feature_names", &self.feature_names.len())
            .finish()
    }
}
