use crate::pipeline::{MultiplierPipeline, Stage};
use fresh_shared::{Category, ProductSnapshot};
use serde::{Deserialize, Serialize};

/// Bounds applied after every stage has run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBounds {
    /// Multiplier floor for fresh products with decent demand
    pub fresh_demand_floor: f64,

    /// Demand score above which the fresh floor applies
    pub fresh_demand_threshold: f64,

    /// Multiplier ceiling unless stock is truly scarce
    pub max_multiplier: f64,

    /// Stock levels at or below this count as scarce (no ceiling)
    pub scarce_stock_level: u32,

    /// Absolute minimum price as a fraction of the current price
    pub min_price_ratio: f64,
}

impl Default for PricingBounds {
    fn default() -> Self {
        Self {
            fresh_demand_floor: 0.70,
            fresh_demand_threshold: 0.5,
            max_multiplier: 1.35,
            scarce_stock_level: 5,
            min_price_ratio: 0.05,
        }
    }
}

/// Category adjustments used at serving time
pub fn category_multiplier(category: Category) -> f64 {
    match category {
        Category::Meat => 1.05,
        Category::Seafood => 1.08,
        Category::Dairy => 1.02,
        Category::Fruits => 0.98,
        Category::Vegetables => 0.96,
        Category::Bakery => 0.95,
        Category::Other => 1.0,
    }
}

/// Deterministic rule-based pricing, used whenever the model is unavailable
#[derive(Debug, Clone)]
pub struct RuleBasedCalculator {
    pipeline: MultiplierPipeline<f64>,
    bounds: PricingBounds,
}

impl RuleBasedCalculator {
    pub fn new(bounds: PricingBounds) -> Self {
        let pipeline = MultiplierPipeline::new(vec![
            Stage::expiry([0.05, 0.25, 0.45, 0.60, 0.75, 0.85, 0.95, 1.0, 1.05]),
            Stage::demand([0.75, 0.85, 0.95, 1.0, 1.08, 1.15, 1.25]),
            Stage::stock([0.80, 0.90, 0.96, 1.0, 1.08, 1.15, 1.30]),
            Stage::sales_velocity([0.85, 0.92, 1.05, 1.10, 1.15]),
            Stage::category(category_multiplier),
        ]);

        Self { pipeline, bounds }
    }

    pub fn bounds(&self) -> &PricingBounds {
        &self.bounds
    }

    /// Stage product after the fresh-demand floor and the scarcity ceiling
    pub fn multiplier(&self, snapshot: &ProductSnapshot) -> f64 {
        let mut multiplier = self.pipeline.multiplier(snapshot, |factor| *factor);

        if snapshot.days_to_expiry() > 0 && snapshot.demand_score() > self.bounds.fresh_demand_threshold {
            multiplier = multiplier.max(self.bounds.fresh_demand_floor);
        }

        if snapshot.stock_level() > self.bounds.scarce_stock_level {
            multiplier = multiplier.min(self.bounds.max_multiplier);
        }

        multiplier
    }

    /// Recommended price, never below `min_price_ratio` of the current price
    pub fn price(&self, snapshot: &ProductSnapshot) -> f64 {
        let current_price = snapshot.current_price();
        let price = current_price * self.multiplier(snapshot);
        price.max(current_price * self.bounds.min_price_ratio)
    }
}

impl Default for RuleBasedCalculator {
    fn default() -> Self {
        Self::new(PricingBounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresh_shared::{round_to, DayOfWeek};

    fn snapshot(
        price: f64,
        days: i32,
        stock: u32,
        demand: f64,
        category: Category,
        sales: f64,
    ) -> ProductSnapshot {
        ProductSnapshot::new(price, days, stock, demand, category, sales, DayOfWeek::Monday).unwrap()
    }

    #[test]
    fn test_expired_dairy_hits_absolute_floor() {
        let calculator = RuleBasedCalculator::default();
        let product = snapshot(10.0, 0, 60, 0.5, Category::Dairy, 10.0);

        // 0.05 * 1.0 (demand 0.5 is in the [0.5, 0.7) bucket) * 1.0 * 0.92 * 1.02
        let multiplier = calculator.multiplier(&product);
        assert!((multiplier - 0.05 * 0.92 * 1.02).abs() < 1e-12);

        let price = calculator.price(&product);
        assert_eq!(round_to(price, 2), 0.5);

        // 50 units is in the > 20 bucket, which lifts it just over the floor
        let moderate_stock = snapshot(10.0, 0, 50, 0.5, Category::Dairy, 10.0);
        assert_eq!(round_to(calculator.price(&moderate_stock), 2), 0.51);
    }

    #[test]
    fn test_fresh_high_demand_floor() {
        let calculator = RuleBasedCalculator::default();
        // 0.25 * 1.08 * 0.80 * 0.85 * 0.95 is far below the floor
        let product = snapshot(20.0, 1, 400, 0.75, Category::Bakery, 1.0);

        assert_eq!(calculator.multiplier(&product), 0.70);
        assert!((calculator.price(&product) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_applies_only_above_scarce_stock() {
        let calculator = RuleBasedCalculator::default();

        // 1.05 * 1.25 * 1.30 * 1.05 * 1.08 ~= 1.94 before bounds
        let plentiful = snapshot(10.0, 30, 8, 0.95, Category::Seafood, 60.0);
        assert_eq!(calculator.multiplier(&plentiful), 1.35);

        let scarce = snapshot(10.0, 30, 3, 0.95, Category::Seafood, 60.0);
        let expected = 1.05 * 1.25 * 1.30 * 1.05 * 1.08;
        assert!((calculator.multiplier(&scarce) - expected).abs() < 1e-12);
        assert!(calculator.multiplier(&scarce) > 1.35);
    }

    #[test]
    fn test_sales_above_fifty_always_use_first_premium() {
        let calculator = RuleBasedCalculator::default();
        let good = snapshot(10.0, 10, 60, 0.6, Category::Other, 60.0);
        let top = snapshot(10.0, 10, 60, 0.6, Category::Other, 250.0);

        assert_eq!(calculator.multiplier(&good), calculator.multiplier(&top));
        assert!((calculator.multiplier(&top) - 0.95 * 1.05).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_category_is_neutral() {
        let calculator = RuleBasedCalculator::default();
        let other = snapshot(10.0, 10, 60, 0.6, Category::from_name("frozen"), 30.0);

        assert!((calculator.multiplier(&other) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_floor_and_ceiling_hold_across_grid() {
        let calculator = RuleBasedCalculator::default();

        for days in [-5, 0, 1, 2, 3, 4, 6, 7, 10, 14, 18, 21, 40] {
            for stock in [0, 3, 5, 6, 11, 25, 75, 150, 250, 350] {
                for demand in [0.0, 0.05, 0.2, 0.4, 0.5, 0.51, 0.75, 0.85, 1.0] {
                    for sales in [0.0, 4.0, 12.0, 30.0, 75.0, 300.0] {
                        for category in Category::ALL {
                            let product = snapshot(7.5, days, stock, demand, category, sales);
                            let price = calculator.price(&product);

                            assert!(price >= 7.5 * 0.05);
                            if stock > 5 {
                                assert!(calculator.multiplier(&product) <= 1.35);
                            }
                            assert_eq!(price, calculator.price(&product));
                        }
                    }
                }
            }
        }
    }
}
