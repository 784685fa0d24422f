use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a recommended price was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMethod {
    MlModel,
    RuleBased,
    RuleBasedFallback,
}

impl PricingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMethod::MlModel => "ml_model",
            PricingMethod::RuleBased => "rule_based",
            PricingMethod::RuleBasedFallback => "rule_based_fallback",
        }
    }
}

impl fmt::Display for PricingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags explaining which conditions drove a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorTag {
    // expiry
    ExpiredClearance,
    CriticalExpiry,
    ExpiryProximity,
    ShortShelfLife,
    // stock
    ExcessInventory,
    HighStock,
    LowStock,
    CriticalStock,
    // demand
    LowDemand,
    HighDemand,
    PeakDemand,
    // sales velocity
    SlowMoving,
    FastMoving,
    // combined
    UrgentClearanceNeeded,
    ScarcityPremium,
    // degraded paths
    RuleBasedFallback,
    ErrorFallback,
    BatchErrorFallback,
}

impl FactorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorTag::ExpiredClearance => "expired_clearance",
            FactorTag::CriticalExpiry => "critical_expiry",
            FactorTag::ExpiryProximity => "expiry_proximity",
            FactorTag::ShortShelfLife => "short_shelf_life",
            FactorTag::ExcessInventory => "excess_inventory",
            FactorTag::HighStock => "high_stock",
            FactorTag::LowStock => "low_stock",
            FactorTag::CriticalStock => "critical_stock",
            FactorTag::LowDemand => "low_demand",
            FactorTag::HighDemand => "high_demand",
            FactorTag::PeakDemand => "peak_demand",
            FactorTag::SlowMoving => "slow_moving",
            FactorTag::FastMoving => "fast_moving",
            FactorTag::UrgentClearanceNeeded => "urgent_clearance_needed",
            FactorTag::ScarcityPremium => "scarcity_premium",
            FactorTag::RuleBasedFallback => "rule_based_fallback",
            FactorTag::ErrorFallback => "error_fallback",
            FactorTag::BatchErrorFallback => "batch_error_fallback",
        }
    }
}

impl fmt::Display for FactorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to `places` decimal places, correctly rounded on the exact binary
/// value with ties going to the even digit.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let scaled = value * scale;
    if (scaled - scaled.trunc()).abs() != 0.5 {
        return scaled.round() / scale;
    }

    // `scaled` may itself be a rounded product; the exact remainder decides
    let remainder = value.mul_add(scale, -scaled);
    let rounded = if remainder > 0.0 {
        scaled.ceil()
    } else if remainder < 0.0 {
        scaled.floor()
    } else {
        scaled.round_ties_even()
    };
    rounded / scale
}

/// Price recommendation for a single product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub recommended_price: f64,
    pub confidence: Option<f64>,
    pub factors: Vec<FactorTag>,
    pub method: PricingMethod,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    /// Build a result stamped now, with the price rounded to cents
    pub fn new(
        price: f64,
        confidence: Option<f64>,
        factors: Vec<FactorTag>,
        method: PricingMethod,
    ) -> Self {
        Self {
            recommended_price: round_to(price, 2),
            confidence,
            factors,
            method,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResult {
    pub predictions: Vec<PredictionResult>,
    pub total_processed: usize,
    pub timestamp: DateTime<Utc>,
}

impl BatchPredictionResult {
    pub fn new(predictions: Vec<PredictionResult>) -> Self {
        Self {
            total_processed: predictions.len(),
            predictions,
            timestamp: Utc::now(),
        }
    }
}
