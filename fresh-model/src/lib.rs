pub mod dataset;
pub mod features;
pub mod gbt;
pub mod model;
pub mod training;

pub use dataset::{create_synthetic_dataset, price_range, TrainingSample};
pub use features::{default_feature_names, encode, manual_features, FeatureError, FeaturePreprocessor};
pub use gbt::{BoostingParams, GradientBoostedTrees};
pub use model::{ModelBundle, ModelError, PriceModel};
pub use training::{train_model, RegressionMetrics, TrainedModel, TrainingError, TrainingParams};
