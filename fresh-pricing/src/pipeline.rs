use fresh_shared::{Category, DayOfWeek, ProductSnapshot};
use serde::{Deserialize, Serialize};

/// Bucket boundaries shared by the serving rules and the label generator.
/// Each stage below is evaluated top to bottom; the first match wins.
pub const EXPIRY_AT_MOST: [i32; 8] = [0, 1, 2, 3, 5, 7, 14, 21];
pub const DEMAND_BELOW: [f64; 6] = [0.1, 0.3, 0.5, 0.7, 0.8, 0.9];
pub const STOCK_ABOVE: [u32; 6] = [300, 200, 100, 50, 20, 10];

/// Condition a snapshot must meet for a rule to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleCondition {
    ExpiryAtMost(i32),
    DemandBelow(f64),
    StockAbove(u32),
    SalesBelow(f64),
    SalesAbove(f64),
    CategoryIs(Category),
    DayIn(Vec<DayOfWeek>),
    Weekend,
    Otherwise,
}

impl RuleCondition {
    pub fn matches(&self, snapshot: &ProductSnapshot) -> bool {
        match self {
            RuleCondition::ExpiryAtMost(days) => snapshot.days_to_expiry() <= *days,
            RuleCondition::DemandBelow(score) => snapshot.demand_score() < *score,
            RuleCondition::StockAbove(level) => snapshot.stock_level() > *level,
            RuleCondition::SalesBelow(sales) => snapshot.historical_sales() < *sales,
            RuleCondition::SalesAbove(sales) => snapshot.historical_sales() > *sales,
            RuleCondition::CategoryIs(category) => snapshot.category() == *category,
            RuleCondition::DayIn(days) => snapshot.day_of_week().is_some_and(|day| days.contains(&day)),
            RuleCondition::Weekend => snapshot.day_of_week().is_some_and(|day| day.is_weekend()),
            RuleCondition::Otherwise => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingRule<F> {
    pub condition: RuleCondition,
    pub factor: F,
}

/// One adjustment step: an ordered chain of rules, first match wins
#[derive(Debug, Clone, PartialEq)]
pub struct Stage<F> {
    pub name: &'static str,
    pub rules: Vec<PricingRule<F>>,
}

impl<F> Stage<F> {
    pub fn new(name: &'static str, rules: impl IntoIterator<Item = (RuleCondition, F)>) -> Self {
        Self {
            name,
            rules: rules
                .into_iter()
                .map(|(condition, factor)| PricingRule { condition, factor })
                .collect(),
        }
    }

    pub fn select(&self, snapshot: &ProductSnapshot) -> Option<&F> {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(snapshot))
            .map(|rule| &rule.factor)
    }

    /// Days-to-expiry buckets: `<= 0, <= 1, <= 2, <= 3, <= 5, <= 7, <= 14, <= 21`, then fresher.
    pub fn expiry(factors: [F; 9]) -> Self {
        let conditions = EXPIRY_AT_MOST
            .iter()
            .map(|&days| RuleCondition::ExpiryAtMost(days))
            .chain(std::iter::once(RuleCondition::Otherwise));
        Self::new("expiry", conditions.zip(factors))
    }

    /// Demand buckets: `< 0.1, < 0.3, < 0.5, < 0.7, < 0.8, < 0.9`, then higher.
    pub fn demand(factors: [F; 7]) -> Self {
        let conditions = DEMAND_BELOW
            .iter()
            .map(|&score| RuleCondition::DemandBelow(score))
            .chain(std::iter::once(RuleCondition::Otherwise));
        Self::new("demand", conditions.zip(factors))
    }

    /// Stock buckets: `> 300, > 200, > 100, > 50, > 20, > 10`, then scarcer.
    pub fn stock(factors: [F; 7]) -> Self {
        let conditions = STOCK_ABOVE
            .iter()
            .map(|&level| RuleCondition::StockAbove(level))
            .chain(std::iter::once(RuleCondition::Otherwise));
        Self::new("stock", conditions.zip(factors))
    }

    /// Sales velocity chain `< 5, < 20, > 50, > 100, > 200`.
    ///
    /// `> 50` is tested before `> 100` and `> 200`, so the last two buckets
    /// never match. Anything in `[20, 50]` leaves the multiplier unchanged.
    pub fn sales_velocity(factors: [F; 5]) -> Self {
        let conditions = [
            RuleCondition::SalesBelow(5.0),
            RuleCondition::SalesBelow(20.0),
            RuleCondition::SalesAbove(50.0),
            RuleCondition::SalesAbove(100.0),
            RuleCondition::SalesAbove(200.0),
        ];
        Self::new("sales_velocity", conditions.into_iter().zip(factors))
    }

    pub fn category(factor_for: impl Fn(Category) -> F) -> Self {
        Self::new(
            "category",
            Category::ALL
                .into_iter()
                .map(|category| (RuleCondition::CategoryIs(category), factor_for(category))),
        )
    }
}

/// Ordered list of stages whose factors multiply into a single price multiplier.
///
/// `F` is whatever a stage stores per bucket: a fixed `f64` for the serving
/// calculator, a sampling range for the training label generator. The caller
/// decides how a factor turns into a number.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplierPipeline<F> {
    stages: Vec<Stage<F>>,
}

impl<F> MultiplierPipeline<F> {
    pub fn new(stages: Vec<Stage<F>>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage<F>] {
        &self.stages
    }

    pub fn multiplier(&self, snapshot: &ProductSnapshot, mut resolve: impl FnMut(&F) -> f64) -> f64 {
        self.stages.iter().fold(1.0, |multiplier, stage| {
            match stage.select(snapshot) {
                Some(factor) => multiplier * resolve(factor),
                None => multiplier,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(days: i32, stock: u32, demand: f64, sales: f64) -> ProductSnapshot {
        ProductSnapshot::new(10.0, days, stock, demand, Category::Dairy, sales, DayOfWeek::Monday).unwrap()
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let stage = Stage::expiry([1, 2, 3, 4, 5, 6, 7, 8, 9]);

        assert_eq!(stage.select(&snapshot(-3, 10, 0.5, 0.0)), Some(&1));
        assert_eq!(stage.select(&snapshot(1, 10, 0.5, 0.0)), Some(&2));
        assert_eq!(stage.select(&snapshot(4, 10, 0.5, 0.0)), Some(&5));
        assert_eq!(stage.select(&snapshot(21, 10, 0.5, 0.0)), Some(&8));
        assert_eq!(stage.select(&snapshot(22, 10, 0.5, 0.0)), Some(&9));
    }

    #[test]
    fn test_sales_velocity_chain_order() {
        let stage = Stage::sales_velocity(["slow", "slower", "good", "fast", "top"]);

        assert_eq!(stage.select(&snapshot(5, 10, 0.5, 4.0)), Some(&"slow"));
        assert_eq!(stage.select(&snapshot(5, 10, 0.5, 19.5)), Some(&"slower"));
        assert_eq!(stage.select(&snapshot(5, 10, 0.5, 35.0)), None);
        assert_eq!(stage.select(&snapshot(5, 10, 0.5, 150.0)), Some(&"good"));
        assert_eq!(stage.select(&snapshot(5, 10, 0.5, 500.0)), Some(&"good"));
    }

    #[test]
    fn test_day_rules_skip_unknown_day() {
        let stage = Stage::new(
            "day_of_week",
            [
                (RuleCondition::Weekend, "weekend"),
                (RuleCondition::DayIn(vec![DayOfWeek::Monday]), "monday"),
            ],
        );
        let on = |day: Option<DayOfWeek>| {
            ProductSnapshot::new(10.0, 5, 10, 0.5, Category::Dairy, 0.0, day).unwrap()
        };

        assert_eq!(stage.select(&on(Some(DayOfWeek::Sunday))), Some(&"weekend"));
        assert_eq!(stage.select(&on(Some(DayOfWeek::Monday))), Some(&"monday"));
        assert_eq!(stage.select(&on(Some(DayOfWeek::Friday))), None);
        assert_eq!(stage.select(&on(None)), None);
    }

    #[test]
    fn test_pipeline_skips_unmatched_stage() {
        let pipeline = MultiplierPipeline::new(vec![
            Stage::new("half", [(RuleCondition::Otherwise, 0.5)]),
            Stage::new("never", [(RuleCondition::StockAbove(1_000), 10.0)]),
        ]);

        let multiplier = pipeline.multiplier(&snapshot(5, 10, 0.5, 30.0), |f| *f);
        assert_eq!(multiplier, 0.5);
    }
}
