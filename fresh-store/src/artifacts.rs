//! On-disk model artifacts.
//!
//! A model directory holds three independent JSON files (the boosted trees,
//! the fitted preprocessor and the feature names) plus an optional CSV dump of
//! the training data. A loaded model is only usable together with its
//! preprocessor, so both must be present for a bundle to load.

use fresh_model::{
    default_feature_names, FeaturePreprocessor, GradientBoostedTrees, ModelBundle, PriceModel, TrainedModel,
    TrainingSample,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MODEL_FILE: &str = "gbt_pricing_model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const TRAINING_DATA_FILE: &str = "training_data.csv";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Model expects {model} features but preprocessor produces {preprocessor}")]
    Incompatible { model: usize, preprocessor: usize },
}

/// Flat row written to the training CSV
#[derive(Debug, Serialize)]
struct TrainingRow<'a> {
    current_price: f64,
    days_to_expiry: i32,
    stock_level: u32,
    demand_score: f64,
    category: &'a str,
    historical_sales: f64,
    day_of_week: &'a str,
    target_price: f64,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// True when both the model and its preprocessor are on disk
    pub fn has_model(&self) -> bool {
        self.path(MODEL_FILE).is_file() && self.path(PREPROCESSOR_FILE).is_file()
    }

    pub fn load_model(&self) -> Result<GradientBoostedTrees, ArtifactError> {
        self.read_json(MODEL_FILE)
    }

    pub fn load_preprocessor(&self) -> Result<FeaturePreprocessor, ArtifactError> {
        self.read_json(PREPROCESSOR_FILE)
    }

    /// Saved feature names, or `None` when the file is absent
    pub fn load_feature_names(&self) -> Result<Option<Vec<String>>, ArtifactError> {
        if !self.path(FEATURE_NAMES_FILE).is_file() {
            return Ok(None);
        }
        self.read_json(FEATURE_NAMES_FILE).map(Some)
    }

    pub fn load_bundle(&self) -> Result<ModelBundle, ArtifactError> {
        let model = self.load_model()?;
        let preprocessor = self.load_preprocessor()?;

        if model.n_features() != preprocessor.n_features() {
            return Err(ArtifactError::Incompatible {
                model: model.n_features(),
                preprocessor: preprocessor.n_features(),
            });
        }

        let feature_names = match self.load_feature_names()? {
            Some(names) => names,
            None => {
                warn!("{} not found, using default feature names", FEATURE_NAMES_FILE);
                default_feature_names()
            }
        };

        info!(
            dir = %self.dir.display(),
            features = feature_names.len(),
            "Loaded model artifacts"
        );

        Ok(ModelBundle::new(Arc::new(model), Some(preprocessor), feature_names))
    }

    pub fn save(&self, trained: &TrainedModel) -> Result<(), ArtifactError> {
        self.write_json(MODEL_FILE, &trained.model)?;
        self.write_json(PREPROCESSOR_FILE, &trained.preprocessor)?;
        self.write_json(FEATURE_NAMES_FILE, &trained.feature_names)?;

        info!(dir = %self.dir.display(), "Saved model artifacts");
        Ok(())
    }

    pub fn save_training_data(&self, samples: &[TrainingSample]) -> Result<PathBuf, ArtifactError> {
        self.ensure_dir()?;
        let path = self.path(TRAINING_DATA_FILE);
        let mut writer = csv::Writer::from_path(&path)?;

        for sample in samples {
            let s = &sample.snapshot;
            writer.serialize(TrainingRow {
                current_price: s.current_price(),
                days_to_expiry: s.days_to_expiry(),
                stock_level: s.stock_level(),
                demand_score: s.demand_score(),
                category: s.category().as_str(),
                historical_sales: s.historical_sales(),
                day_of_week: s.day_name(),
                target_price: sample.target_price,
            })?;
        }
        writer.flush().map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), rows = samples.len(), "Wrote training data");
        Ok(path)
    }

    fn ensure_dir(&self) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T, ArtifactError> {
        let path = self.path(file);
        let reader = File::open(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(reader)).map_err(|source| ArtifactError::Json { path, source })
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), ArtifactError> {
        self.ensure_dir()?;
        let path = self.path(file);
        let io_error = |source| ArtifactError::Io {
            path: path.clone(),
            source,
        };
        let mut writer = BufWriter::new(File::create(&path).map_err(io_error)?);

        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ArtifactError::Json {
            path: path.clone(),
            source,
        })?;
        writer.flush().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresh_model::{create_synthetic_dataset, train_model, BoostingParams, TrainingParams};
    use tempfile::TempDir;

    fn trained() -> (Vec<TrainingSample>, TrainedModel) {
        let dataset = create_synthetic_dataset(300, 42).unwrap();
        let params = TrainingParams {
            boosting: BoostingParams {
                n_estimators: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        let model = train_model(&dataset, &params).unwrap();
        (dataset, model)
    }

    #[test]
    fn test_save_then_load_bundle() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"));
        let (dataset, trained) = trained();

        assert!(!store.has_model());
        store.save(&trained).unwrap();
        assert!(store.has_model());

        let bundle = store.load_bundle().unwrap();
        assert_eq!(bundle.feature_names, trained.feature_names);

        let snapshot = &dataset[0].snapshot;
        let expected = trained.clone().into_bundle().predict(snapshot).unwrap();
        assert!((bundle.predict(snapshot).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_missing_feature_names_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (_, trained) = trained();

        store.save(&trained).unwrap();
        fs::remove_file(store.path(FEATURE_NAMES_FILE)).unwrap();

        let bundle = store.load_bundle().unwrap();
        assert_eq!(bundle.feature_names, default_feature_names());
    }

    #[test]
    fn test_corrupt_model_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (_, trained) = trained();

        store.save(&trained).unwrap();
        fs::write(store.path(MODEL_FILE), "not json").unwrap();

        assert!(matches!(store.load_bundle(), Err(ArtifactError::Json { .. })));
    }

    #[test]
    fn test_model_with_looping_tree_does_not_load() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (_, trained) = trained();

        store.save(&trained).unwrap();
        let mut model = serde_json::to_value(&trained.model).unwrap();
        model["trees"][0]["nodes"] = serde_json::json!([
            {"kind": "split", "feature": 0, "threshold": 0.5, "left": 0, "right": 1},
            {"kind": "leaf", "value": 0.0}
        ]);
        fs::write(store.path(MODEL_FILE), model.to_string()).unwrap();

        assert!(matches!(store.load_bundle(), Err(ArtifactError::Json { .. })));
    }

    #[test]
    fn test_missing_model_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(matches!(store.load_model(), Err(ArtifactError::Io { .. })));
    }

    #[test]
    fn test_training_data_csv() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let (dataset, _) = trained();

        let path = store.save_training_data(&dataset[..10]).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();

        assert_eq!(
            lines.next(),
            Some("current_price,days_to_expiry,stock_level,demand_score,category,historical_sales,day_of_week,target_price")
        );
        assert_eq!(lines.count(), 10);
    }
}
