use crate::pipeline::{MultiplierPipeline, RuleCondition, Stage};
use fresh_shared::{round_to, Category, DayOfWeek, ProductSnapshot};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Half-open sampling interval `[low, high)` for a stochastic factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformFactor {
    pub low: f64,
    pub high: f64,
}

impl UniformFactor {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..self.high)
    }
}

const fn u(low: f64, high: f64) -> UniformFactor {
    UniformFactor::new(low, high)
}

fn category_range(category: Category) -> UniformFactor {
    match category {
        Category::Dairy => u(0.95, 1.0),
        Category::Meat => u(0.98, 1.02),
        Category::Vegetables => u(0.90, 0.95),
        Category::Fruits => u(0.90, 0.95),
        Category::Bakery => u(0.85, 0.95),
        Category::Seafood => u(1.0, 1.05),
        Category::Other => u(0.95, 1.0),
    }
}

/// Generates noisy but directionally consistent target prices for training.
///
/// Uses the same bucket boundaries as [`crate::RuleBasedCalculator`] with a
/// sampled factor per bucket, then a second sales pass, category and weekday
/// adjustments, and multiplicative Gaussian noise. All randomness comes from
/// the caller's RNG, so a seeded RNG reproduces the same labels.
#[derive(Debug, Clone)]
pub struct SyntheticLabelGenerator {
    pipeline: MultiplierPipeline<UniformFactor>,
    noise_std_dev: f64,
    min_price_ratio: f64,
}

impl SyntheticLabelGenerator {
    pub fn new() -> Self {
        let pipeline = MultiplierPipeline::new(vec![
            Stage::expiry([
                u(0.05, 0.15),
                u(0.20, 0.40),
                u(0.40, 0.60),
                u(0.55, 0.75),
                u(0.75, 0.90),
                u(0.88, 0.98),
                u(0.95, 1.05),
                u(0.98, 1.10),
                u(1.00, 1.15),
            ]),
            Stage::demand([
                u(0.70, 0.85),
                u(0.80, 0.95),
                u(0.90, 1.00),
                u(0.95, 1.05),
                u(1.02, 1.12),
                u(1.08, 1.20),
                u(1.15, 1.35),
            ]),
            Stage::stock([
                u(0.75, 0.90),
                u(0.85, 0.95),
                u(0.92, 1.02),
                u(0.98, 1.05),
                u(1.05, 1.15),
                u(1.12, 1.25),
                u(1.20, 1.50),
            ]),
            Stage::sales_velocity([
                u(0.80, 0.92),
                u(0.90, 0.98),
                u(1.02, 1.08),
                u(1.05, 1.15),
                u(1.10, 1.25),
            ]),
            // Second sales pass, applied on top of the velocity stage.
            Stage::new(
                "sales_influence",
                [
                    (RuleCondition::SalesBelow(20.0), u(0.90, 0.95)),
                    (RuleCondition::SalesAbove(100.0), u(1.00, 1.05)),
                ],
            ),
            Stage::category(category_range),
            Stage::new(
                "day_of_week",
                [
                    (RuleCondition::Weekend, u(1.00, 1.05)),
                    (RuleCondition::DayIn(vec![DayOfWeek::Monday]), u(0.95, 1.00)),
                ],
            ),
        ]);

        Self {
            pipeline,
            noise_std_dev: 0.02,
            min_price_ratio: 0.05,
        }
    }

    pub fn target_price<R: Rng + ?Sized>(&self, snapshot: &ProductSnapshot, rng: &mut R) -> f64 {
        let current_price = snapshot.current_price();
        let multiplier = self.pipeline.multiplier(snapshot, |factor| factor.sample(&mut *rng));

        let noise = 1.0 + self.noise_std_dev * standard_normal(rng);
        let price = (current_price * multiplier * noise).max(current_price * self.min_price_ratio);

        round_to(price, 2)
    }
}

impl Default for SyntheticLabelGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard normal draw via the Box-Muller transform
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn snapshot(
        days: i32,
        stock: u32,
        demand: f64,
        category: Category,
        sales: f64,
        day: impl Into<Option<DayOfWeek>>,
    ) -> ProductSnapshot {
        ProductSnapshot::new(20.0, days, stock, demand, category, sales, day).unwrap()
    }

    #[test]
    fn test_same_seed_same_labels() {
        let generator = SyntheticLabelGenerator::new();
        let products: Vec<_> = (0..50i32)
            .map(|i| {
                let idx = i as usize % 7;
                snapshot(
                    i % 30 - 2,
                    (i * 17) as u32 % 500,
                    (f64::from(i) * 0.019) % 1.0,
                    Category::ALL[idx],
                    f64::from(i * 3),
                    DayOfWeek::WEEK[idx],
                )
            })
            .collect();

        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);

        let first: Vec<f64> = products.iter().map(|p| generator.target_price(p, &mut rng1)).collect();
        let second: Vec<f64> = products.iter().map(|p| generator.target_price(p, &mut rng2)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_labels_respect_floor_and_rounding() {
        let generator = SyntheticLabelGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let expired = snapshot(-2, 450, 0.05, Category::Bakery, 1.0, DayOfWeek::Monday);

        for _ in 0..500 {
            let price = generator.target_price(&expired, &mut rng);
            assert!(price >= 1.0);
            assert_eq!(price, round_to(price, 2));
        }
    }

    #[test]
    fn test_labels_follow_rule_direction() {
        let generator = SyntheticLabelGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let fresh_scarce = snapshot(28, 4, 0.95, Category::Seafood, 60.0, DayOfWeek::Saturday);
        let stale_glut = snapshot(1, 420, 0.05, Category::Bakery, 2.0, DayOfWeek::Monday);

        let premium = generator.target_price(&fresh_scarce, &mut rng);
        let markdown = generator.target_price(&stale_glut, &mut rng);

        assert!(premium > 20.0);
        assert!(markdown < 10.0);
    }

    #[test]
    fn test_unknown_day_gets_no_weekday_factor() {
        let generator = SyntheticLabelGenerator::new();
        let friday = snapshot(6, 80, 0.6, Category::Fruits, 30.0, DayOfWeek::Friday);
        let unknown = snapshot(6, 80, 0.6, Category::Fruits, 30.0, None);

        let mut rng1 = ChaCha8Rng::seed_from_u64(5);
        let mut rng2 = ChaCha8Rng::seed_from_u64(5);

        assert_eq!(
            generator.target_price(&friday, &mut rng1),
            generator.target_price(&unknown, &mut rng2)
        );
    }

    #[test]
    fn test_standard_normal_is_centred() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let n = 20_000;
        let mean = (0..n).map(|_| standard_normal(&mut rng)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.05);
    }
}
