pub mod batch;
pub mod lifecycle;
pub mod predictor;
pub mod registry;

pub use batch::{BatchError, BatchPredictor, PredictionError, SnapshotPredictor};
pub use lifecycle::{LifecycleError, ModelLifecycle, ModelStatus, RetrainSummary};
pub use predictor::PricePredictor;
pub use registry::ModelRegistry;
