use crate::predictor::PricePredictor;
use fresh_pricing::RuleBasedCalculator;
use fresh_shared::{BatchPredictionResult, FactorTag, PredictionResult, PricingMethod, ProductSnapshot};
use tracing::{error, info};

const BATCH_FALLBACK_CONFIDENCE: f64 = 0.4;

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Prediction failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BatchError {
    #[error("Batch of {size} products exceeds the maximum of {max}")]
    TooLarge { size: usize, max: usize },
}

/// Anything that can price a single snapshot, possibly failing
pub trait SnapshotPredictor {
    fn try_predict(&self, snapshot: &ProductSnapshot) -> Result<PredictionResult, PredictionError>;
}

impl SnapshotPredictor for PricePredictor {
    fn try_predict(&self, snapshot: &ProductSnapshot) -> Result<PredictionResult, PredictionError> {
        Ok(self.predict(snapshot))
    }
}

/// Prices a list of snapshots one by one.
///
/// Output order and length always match the input. An item whose prediction
/// fails gets the calculator price instead and does not affect its neighbours.
#[derive(Debug, Clone)]
pub struct BatchPredictor {
    calculator: RuleBasedCalculator,
    max_batch_size: usize,
}

impl BatchPredictor {
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            calculator: RuleBasedCalculator::default(),
            max_batch_size,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn predict_batch<P: SnapshotPredictor + ?Sized>(
        &self,
        predictor: &P,
        snapshots: &[ProductSnapshot],
    ) -> Result<BatchPredictionResult, BatchError> {
        if snapshots.len() > self.max_batch_size {
            return Err(BatchError::TooLarge {
                size: snapshots.len(),
                max: self.max_batch_size,
            });
        }

        let predictions: Vec<PredictionResult> = snapshots
            .iter()
            .enumerate()
            .map(|(index, snapshot)| {
                predictor.try_predict(snapshot).unwrap_or_else(|e| {
                    error!("Error predicting batch item {}: {}", index, e);
                    PredictionResult::new(
                        self.calculator.price(snapshot),
                        Some(BATCH_FALLBACK_CONFIDENCE),
                        vec![FactorTag::BatchErrorFallback],
                        PricingMethod::RuleBasedFallback,
                    )
                })
            })
            .collect();

        info!("Processed batch of {} products", predictions.len());
        Ok(BatchPredictionResult::new(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;
    use fresh_shared::{Category, DayOfWeek};
    use std::sync::Arc;

    /// Fails for any product priced above a threshold
    struct Picky {
        inner: PricePredictor,
        max_price: f64,
    }

    impl SnapshotPredictor for Picky {
        fn try_predict(&self, snapshot: &ProductSnapshot) -> Result<PredictionResult, PredictionError> {
            if snapshot.current_price() > self.max_price {
                return Err(PredictionError::Failed("price out of range".into()));
            }
            self.inner.try_predict(snapshot)
        }
    }

    fn product(price: f64) -> ProductSnapshot {
        ProductSnapshot::new(price, 0, 60, 0.5, Category::Dairy, 10.0, DayOfWeek::Monday).unwrap()
    }

    fn predictor() -> PricePredictor {
        PricePredictor::new(Arc::new(ModelRegistry::new()))
    }

    #[test]
    fn test_empty_batch() {
        let result = BatchPredictor::new(10).predict_batch(&predictor(), &[]).unwrap();

        assert_eq!(result.total_processed, 0);
        assert!(result.predictions.is_empty());
    }

    #[test]
    fn test_output_matches_input_order() {
        let products = vec![product(10.0), product(20.0), product(40.0)];
        let result = BatchPredictor::new(10).predict_batch(&predictor(), &products).unwrap();

        assert_eq!(result.total_processed, 3);
        let prices: Vec<f64> = result.predictions.iter().map(|p| p.recommended_price).collect();
        assert_eq!(prices, vec![0.50, 1.0, 2.0]);
    }

    #[test]
    fn test_failing_item_is_isolated() {
        let picky = Picky {
            inner: predictor(),
            max_price: 15.0,
        };
        let products = vec![product(10.0), product(20.0), product(12.0)];

        let result = BatchPredictor::new(10).predict_batch(&picky, &products).unwrap();

        assert_eq!(result.total_processed, 3);
        assert_eq!(result.predictions[0].method, PricingMethod::RuleBased);
        assert_eq!(result.predictions[2].method, PricingMethod::RuleBased);

        let failed = &result.predictions[1];
        assert_eq!(failed.recommended_price, 1.0);
        assert_eq!(failed.confidence, Some(0.4));
        assert_eq!(failed.factors, vec![FactorTag::BatchErrorFallback]);
        assert_eq!(failed.method, PricingMethod::RuleBasedFallback);
    }

    #[test]
    fn test_oversized_batch_is_rejected() {
        let products = vec![product(10.0); 3];
        let err = BatchPredictor::new(2).predict_batch(&predictor(), &products).unwrap_err();

        assert_eq!(err, BatchError::TooLarge { size: 3, max: 2 });
    }
}
