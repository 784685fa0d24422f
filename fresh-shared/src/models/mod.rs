pub mod prediction;
pub mod snapshot;

pub use prediction::{round_to, BatchPredictionResult, FactorTag, PredictionResult, PricingMethod};
pub use snapshot::{Category, DayOfWeek, ProductData, ProductSnapshot, SnapshotError};
