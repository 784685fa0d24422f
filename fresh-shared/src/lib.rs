pub mod models;

pub use models::{
    round_to, BatchPredictionResult, Category, DayOfWeek, FactorTag, PredictionResult,
    PricingMethod, ProductData, ProductSnapshot, SnapshotError,
};
