use crate::training::TrainingError;
use fresh_pricing::SyntheticLabelGenerator;
use fresh_shared::{Category, DayOfWeek, ProductSnapshot};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Categories sampled when generating data, in sampling order
pub const GENERATION_CATEGORIES: [Category; 7] = [
    Category::Dairy,
    Category::Meat,
    Category::Vegetables,
    Category::Fruits,
    Category::Bakery,
    Category::Seafood,
    Category::Other,
];

const DAYS_TO_EXPIRY: std::ops::Range<i32> = -2..30;
const MAX_STOCK: u32 = 500;
const MEAN_DAILY_SALES: f64 = 50.0;

/// Typical shelf price range for a category
pub fn price_range(category: Category) -> (f64, f64) {
    match category {
        Category::Dairy => (2.0, 15.0),
        Category::Meat => (5.0, 50.0),
        Category::Vegetables => (1.0, 8.0),
        Category::Fruits => (1.0, 12.0),
        Category::Bakery => (2.0, 20.0),
        Category::Seafood => (8.0, 60.0),
        Category::Other => (1.0, 30.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub snapshot: ProductSnapshot,
    pub target_price: f64,
}

/// Generate `n` labelled products. The same seed always yields the same rows.
pub fn create_synthetic_dataset(n: usize, seed: u64) -> Result<Vec<TrainingSample>, TrainingError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels = SyntheticLabelGenerator::new();

    (0..n)
        .map(|_| {
            let snapshot = random_snapshot(&mut rng)?;
            let target_price = labels.target_price(&snapshot, &mut rng);
            Ok(TrainingSample { snapshot, target_price })
        })
        .collect()
}

fn random_snapshot<R: Rng + ?Sized>(rng: &mut R) -> Result<ProductSnapshot, TrainingError> {
    let category = GENERATION_CATEGORIES[rng.gen_range(0..GENERATION_CATEGORIES.len())];
    let (low, high) = price_range(category);
    let day = DayOfWeek::WEEK[rng.gen_range(0..DayOfWeek::WEEK.len())];

    let snapshot = ProductSnapshot::new(
        rng.gen_range(low..high),
        rng.gen_range(DAYS_TO_EXPIRY),
        rng.gen_range(0..MAX_STOCK),
        beta_2_2(rng),
        category,
        f64::from(poisson(rng, MEAN_DAILY_SALES)),
        day,
    )?;

    Ok(snapshot)
}

/// Beta(2, 2): the median of three uniforms
fn beta_2_2<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut draws: [f64; 3] = [rng.gen(), rng.gen(), rng.gen()];
    draws.sort_by(f64::total_cmp);
    draws[1]
}

/// Knuth's multiplication method, fine for small means
fn poisson<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> u32 {
    let limit = (-mean).exp();
    let mut product: f64 = rng.gen();
    let mut count = 0;

    while product > limit {
        product *= rng.gen::<f64>();
        count += 1;
    }

    count
}
