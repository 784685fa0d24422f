use fresh_shared::{Category, DayOfWeek, ProductSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Numeric inputs, in feature-vector order
pub const NUMERIC_FEATURES: [&str; 5] = [
    "current_price",
    "days_to_expiry",
    "stock_level",
    "demand_score",
    "historical_sales",
];

fn numeric_values(snapshot: &ProductSnapshot) -> [f64; 5] {
    [
        snapshot.current_price(),
        f64::from(snapshot.days_to_expiry()),
        f64::from(snapshot.stock_level()),
        snapshot.demand_score(),
        snapshot.historical_sales(),
    ]
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Cannot fit a preprocessor on an empty dataset")]
    EmptyDataset,

    #[error("Unknown {column} value: {value}")]
    UnknownLevel { column: &'static str, value: String },
}

/// Standardises one numeric column to zero mean and unit variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler {
    pub mean: f64,
    pub scale: f64,
}

impl ColumnScaler {
    fn fit(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        Self {
            mean,
            // constant columns pass through centred but unscaled
            scale: if std_dev > 0.0 { std_dev } else { 1.0 },
        }
    }

    fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Fitted feature transform: scaled numerics, then one-hot category and
/// day of week with the first (alphabetical) level of each dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    scalers: Vec<ColumnScaler>,
    categories: Vec<Category>,
    days: Vec<DayOfWeek>,
}

impl FeaturePreprocessor {
    pub fn fit(snapshots: &[ProductSnapshot]) -> Result<Self, FeatureError> {
        if snapshots.is_empty() {
            return Err(FeatureError::EmptyDataset);
        }

        let rows: Vec<[f64; 5]> = snapshots.iter().map(numeric_values).collect();
        let scalers = (0..NUMERIC_FEATURES.len())
            .map(|col| {
                let column: Vec<f64> = rows.iter().map(|row| row[col]).collect();
                ColumnScaler::fit(&column)
            })
            .collect();

        let mut categories: Vec<Category> = snapshots.iter().map(|s| s.category()).collect();
        categories.sort();
        categories.dedup();

        let mut days: Vec<DayOfWeek> = snapshots.iter().filter_map(|s| s.day_of_week()).collect();
        days.sort();
        days.dedup();

        Ok(Self { scalers, categories, days })
    }

    pub fn transform(&self, snapshot: &ProductSnapshot) -> Result<Vec<f64>, FeatureError> {
        let mut features: Vec<f64> = numeric_values(snapshot)
            .iter()
            .zip(&self.scalers)
            .map(|(value, scaler)| scaler.transform(*value))
            .collect();

        features.extend(one_hot_drop_first(&self.categories, snapshot.category(), "category")?);
        let day = snapshot.day_of_week().ok_or_else(|| FeatureError::UnknownLevel {
            column: "day_of_week",
            value: snapshot.day_name().to_string(),
        })?;
        features.extend(one_hot_drop_first(&self.days, day, "day_of_week")?);

        Ok(features)
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|n| n.to_string()).collect();
        names.extend(self.categories.iter().skip(1).map(|c| format!("category_{}", c)));
        names.extend(self.days.iter().skip(1).map(|d| format!("day_of_week_{}", d)));
        names
    }

    pub fn n_features(&self) -> usize {
        NUMERIC_FEATURES.len() + self.categories.len().saturating_sub(1) + self.days.len().saturating_sub(1)
    }
}

fn one_hot_drop_first<T: PartialEq + Display>(
    levels: &[T],
    value: T,
    column: &'static str,
) -> Result<Vec<f64>, FeatureError> {
    let position = levels
        .iter()
        .position(|level| *level == value)
        .ok_or_else(|| FeatureError::UnknownLevel {
            column,
            value: value.to_string(),
        })?;

    Ok((1..levels.len())
        .map(|i| if i == position { 1.0 } else { 0.0 })
        .collect())
}

/// Encoding used when no fitted preprocessor is loaded: raw numerics, then a
/// full one-hot over every category and every day, alphabetically. An unknown
/// day leaves every day column at zero.
pub fn manual_features(snapshot: &ProductSnapshot) -> Vec<f64> {
    let mut features = numeric_values(snapshot).to_vec();
    features.extend(
        Category::ALL
            .iter()
            .map(|c| if *c == snapshot.category() { 1.0 } else { 0.0 }),
    );
    features.extend(
        DayOfWeek::ALL
            .iter()
            .map(|d| if Some(*d) == snapshot.day_of_week() { 1.0 } else { 0.0 }),
    );
    features
}

/// Column names matching [`manual_features`]
pub fn default_feature_names() -> Vec<String> {
    let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|n| n.to_string()).collect();
    names.extend(Category::ALL.iter().map(|c| format!("category_{}", c)));
    names.extend(DayOfWeek::ALL.iter().map(|d| format!("day_of_week_{}", d)));
    names
}

/// Encode with the fitted preprocessor when there is one, manually otherwise
pub fn encode(
    preprocessor: Option<&FeaturePreprocessor>,
    snapshot: &ProductSnapshot,
) -> Result<Vec<f64>, FeatureError> {
    match preprocessor {
        Some(preprocessor) => preprocessor.transform(snapshot),
        None => Ok(manual_features(snapshot)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: f64, category: Category, day: impl Into<Option<DayOfWeek>>) -> ProductSnapshot {
        ProductSnapshot::new(price, 4, 30, 0.5, category, 12.0, day).unwrap()
    }

    fn full_vocabulary() -> Vec<ProductSnapshot> {
        Category::ALL
            .iter()
            .zip(DayOfWeek::ALL.iter())
            .enumerate()
            .map(|(i, (c, d))| snapshot(2.0 + i as f64, *c, *d))
            .collect()
    }

    #[test]
    fn test_manual_encoding_layout() {
        let features = manual_features(&snapshot(3.5, Category::Meat, DayOfWeek::Sunday));

        assert_eq!(features.len(), 19);
        assert_eq!(&features[..5], &[3.5, 4.0, 30.0, 0.5, 12.0]);
        // meat is the 4th category, sunday the 4th day
        assert_eq!(features[5 + 3], 1.0);
        assert_eq!(features[12 + 3], 1.0);
        assert_eq!(features.iter().skip(5).sum::<f64>(), 2.0);
    }

    #[test]
    fn test_manual_encoding_of_unknown_day() {
        let features = manual_features(&snapshot(3.5, Category::Meat, None));

        assert_eq!(features.len(), 19);
        assert!(features[12..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_default_feature_names() {
        let names = default_feature_names();

        assert_eq!(names.len(), 19);
        assert_eq!(names[5], "category_bakery");
        assert_eq!(names[11], "category_vegetables");
        assert_eq!(names[12], "day_of_week_friday");
        assert_eq!(names[18], "day_of_week_wednesday");
    }

    #[test]
    fn test_fitted_preprocessor_drops_first_level() {
        let preprocessor = FeaturePreprocessor::fit(&full_vocabulary()).unwrap();
        let names = preprocessor.feature_names();

        assert_eq!(preprocessor.n_features(), 17);
        assert_eq!(names.len(), 17);
        assert_eq!(names[5], "category_dairy");
        assert_eq!(names[11], "day_of_week_monday");

        let bakery_friday = preprocessor
            .transform(&snapshot(5.0, Category::Bakery, DayOfWeek::Friday))
            .unwrap();
        assert!(bakery_friday[5..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_scaling_centres_numeric_columns() {
        let rows = full_vocabulary();
        let preprocessor = FeaturePreprocessor::fit(&rows).unwrap();

        let prices: Vec<f64> = rows.iter().map(|s| preprocessor.transform(s).unwrap()[0]).collect();
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        assert!(mean.abs() < 1e-9);

        // constant column
        let days_to_expiry = preprocessor.transform(&rows[0]).unwrap()[1];
        assert_eq!(days_to_expiry, 0.0);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let rows = vec![
            snapshot(2.0, Category::Dairy, DayOfWeek::Monday),
            snapshot(3.0, Category::Meat, DayOfWeek::Tuesday),
        ];
        let preprocessor = FeaturePreprocessor::fit(&rows).unwrap();

        let err = preprocessor
            .transform(&snapshot(2.0, Category::Seafood, DayOfWeek::Monday))
            .unwrap_err();
        assert_eq!(
            err,
            FeatureError::UnknownLevel {
                column: "category",
                value: "seafood".to_string()
            }
        );
    }

    #[test]
    fn test_fitted_preprocessor_rejects_unknown_day() {
        let preprocessor = FeaturePreprocessor::fit(&full_vocabulary()).unwrap();

        let err = preprocessor.transform(&snapshot(2.0, Category::Dairy, None)).unwrap_err();
        assert_eq!(
            err,
            FeatureError::UnknownLevel {
                column: "day_of_week",
                value: "unknown".to_string()
            }
        );
    }

    #[test]
    fn test_fit_requires_rows() {
        assert_eq!(FeaturePreprocessor::fit(&[]), Err(FeatureError::EmptyDataset));
    }
}
