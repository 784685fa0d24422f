use crate::registry::ModelRegistry;
use fresh_model::{ModelBundle, ModelError};
use fresh_pricing::{explain, RuleBasedCalculator};
use fresh_shared::{round_to, FactorTag, PredictionResult, PricingMethod, ProductSnapshot};
use std::sync::Arc;
use tracing::{debug, error};

const RULE_BASED_CONFIDENCE: f64 = 0.6;
const ERROR_FALLBACK_CONFIDENCE: f64 = 0.5;
const MIN_ML_CONFIDENCE: f64 = 0.6;
const MAX_ML_CONFIDENCE: f64 = 0.95;
/// Model output is never allowed below this share of the shelf price
const MIN_ML_PRICE_RATIO: f64 = 0.10;

/// Prices single products with the loaded model, falling back to the
/// rule-based calculator when no model is loaded or the model path fails.
#[derive(Debug, Clone)]
pub struct PricePredictor {
    registry: Arc<ModelRegistry>,
    calculator: RuleBasedCalculator,
}

impl PricePredictor {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self::with_calculator(registry, RuleBasedCalculator::default())
    }

    pub fn with_calculator(registry: Arc<ModelRegistry>, calculator: RuleBasedCalculator) -> Self {
        Self { registry, calculator }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn calculator(&self) -> &RuleBasedCalculator {
        &self.calculator
    }

    /// Never fails: every error on the model path becomes a rule-based result
    pub fn predict(&self, snapshot: &ProductSnapshot) -> PredictionResult {
        let Some(bundle) = self.registry.current() else {
            debug!("No model loaded, using rule-based pricing");
            return self.rule_based(
                snapshot,
                RULE_BASED_CONFIDENCE,
                FactorTag::RuleBasedFallback,
                PricingMethod::RuleBased,
            );
        };

        match self.model_price(&bundle, snapshot) {
            Ok(result) => result,
            Err(e) => {
                error!("Error in prediction: {}", e);
                self.rule_based(
                    snapshot,
                    ERROR_FALLBACK_CONFIDENCE,
                    FactorTag::ErrorFallback,
                    PricingMethod::RuleBasedFallback,
                )
            }
        }
    }

    /// Calculator price tagged with a single fallback factor
    pub fn rule_based(
        &self,
        snapshot: &ProductSnapshot,
        confidence: f64,
        tag: FactorTag,
        method: PricingMethod,
    ) -> PredictionResult {
        PredictionResult::new(self.calculator.price(snapshot), Some(confidence), vec![tag], method)
    }

    fn model_price(&self, bundle: &ModelBundle, snapshot: &ProductSnapshot) -> Result<PredictionResult, ModelError> {
        let prediction = bundle.predict(snapshot)?;
        let current_price = snapshot.current_price();

        let price = prediction.max(current_price * MIN_ML_PRICE_RATIO);
        let confidence = (1.0 - (prediction - current_price).abs() / current_price)
            .clamp(MIN_ML_CONFIDENCE, MAX_ML_CONFIDENCE);

        debug!(
            model = bundle.model.model_type(),
            prediction,
            price,
            "Model prediction"
        );

        Ok(PredictionResult::new(
            price,
            Some(round_to(confidence, 3)),
            explain(snapshot, price),
            PricingMethod::MlModel,
        ))
    }
}
