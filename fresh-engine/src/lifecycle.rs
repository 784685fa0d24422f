use crate::registry::ModelRegistry;
use fresh_model::{create_synthetic_dataset, train_model, TrainedModel, TrainingError, TrainingParams};
use fresh_store::{ArtifactError, ArtifactStore, ModelConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Training failed: {0}")]
    Training(#[from] TrainingError),

    #[error("Artifact error: {0}")]
    Artifacts(#[from] ArtifactError),
}

/// How the service ended up after startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Loaded,
    Trained,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrainSummary {
    pub status: &'static str,
    pub total_features: usize,
    pub samples: usize,
}

/// Loads, trains and persists models and installs them into the registry
#[derive(Debug, Clone)]
pub struct ModelLifecycle {
    store: ArtifactStore,
    registry: Arc<ModelRegistry>,
    synthetic_samples: usize,
    seed: u64,
    params: TrainingParams,
}

impl ModelLifecycle {
    pub fn new(config: &ModelConfig, registry: Arc<ModelRegistry>) -> Self {
        Self {
            store: ArtifactStore::new(config.dir.clone()),
            registry,
            synthetic_samples: config.synthetic_samples,
            seed: config.seed,
            params: config.training.clone(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Load saved artifacts, or train and save a new model when none exist.
    ///
    /// Failures are logged and leave the registry empty so serving stays on
    /// rule-based pricing.
    pub fn initialize(&self) -> ModelStatus {
        if self.store.has_model() {
            return match self.store.load_bundle() {
                Ok(bundle) => {
                    self.registry.install(bundle);
                    info!("Model loaded successfully");
                    ModelStatus::Loaded
                }
                Err(e) => {
                    error!("Error loading model: {}", e);
                    ModelStatus::Unavailable
                }
            };
        }

        warn!(
            dir = %self.store.dir().display(),
            "No saved model found, training on synthetic data"
        );
        match self.retrain() {
            Ok(_) => ModelStatus::Trained,
            Err(e) => {
                error!("Error training model: {}", e);
                ModelStatus::Unavailable
            }
        }
    }

    /// Train on fresh synthetic data, persist, then swap into the registry.
    ///
    /// Nothing is installed unless the artifacts were saved.
    pub fn retrain(&self) -> Result<RetrainSummary, LifecycleError> {
        let trained = self.train()?;
        self.store.save(&trained)?;

        let summary = RetrainSummary {
            status: "trained",
            total_features: trained.feature_names.len(),
            samples: trained.samples,
        };

        self.registry.install(trained.into_bundle());
        info!(
            samples = summary.samples,
            features = summary.total_features,
            "Installed retrained model"
        );

        Ok(summary)
    }

    fn train(&self) -> Result<TrainedModel, LifecycleError> {
        let dataset = create_synthetic_dataset(self.synthetic_samples, self.seed)?;
        Ok(train_model(&dataset, &self.params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresh_model::BoostingParams;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir, samples: usize) -> ModelConfig {
        ModelConfig {
            dir: dir.path().to_path_buf(),
            synthetic_samples: samples,
            seed: 7,
            training: TrainingParams {
                boosting: BoostingParams {
                    n_estimators: 5,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_initialize_trains_then_loads() {
        let dir = TempDir::new().unwrap();

        let first = ModelLifecycle::new(&config(&dir, 300), Arc::new(ModelRegistry::new()));
        assert_eq!(first.initialize(), ModelStatus::Trained);
        assert!(first.registry().is_loaded());
        assert!(first.store().has_model());

        let second = ModelLifecycle::new(&config(&dir, 300), Arc::new(ModelRegistry::new()));
        assert_eq!(second.initialize(), ModelStatus::Loaded);
        assert!(second.registry().is_loaded());
    }

    #[test]
    fn test_corrupt_artifacts_leave_registry_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gbt_pricing_model.json"), "{").unwrap();
        fs::write(dir.path().join("preprocessor.json"), "{").unwrap();

        let lifecycle = ModelLifecycle::new(&config(&dir, 300), Arc::new(ModelRegistry::new()));

        assert_eq!(lifecycle.initialize(), ModelStatus::Unavailable);
        assert!(!lifecycle.registry().is_loaded());
    }

    #[test]
    fn test_retrain_reports_summary_and_swaps_bundle() {
        let dir = TempDir::new().unwrap();
        let lifecycle = ModelLifecycle::new(&config(&dir, 200), Arc::new(ModelRegistry::new()));

        let summary = lifecycle.retrain().unwrap();

        assert_eq!(summary.status, "trained");
        assert_eq!(summary.samples, 200);
        assert_eq!(summary.total_features, 17);
        assert!(lifecycle.registry().current().unwrap().has_preprocessor());
    }

    #[test]
    fn test_failed_training_installs_nothing() {
        let dir = TempDir::new().unwrap();
        let lifecycle = ModelLifecycle::new(&config(&dir, 0), Arc::new(ModelRegistry::new()));

        assert!(matches!(
            lifecycle.retrain(),
            Err(LifecycleError::Training(TrainingError::EmptyDataset))
        ));
        assert!(!lifecycle.registry().is_loaded());
        assert_eq!(lifecycle.initialize(), ModelStatus::Unavailable);
    }
}
