use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Product categories known to the pricing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bakery,
    Dairy,
    Fruits,
    Meat,
    #[default]
    Other,
    Seafood,
    Vegetables,
}

impl Category {
    /// Alphabetical order, which is also the one-hot column order.
    pub const ALL: [Category; 7] = [
        Category::Bakery,
        Category::Dairy,
        Category::Fruits,
        Category::Meat,
        Category::Other,
        Category::Seafood,
        Category::Vegetables,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bakery => "bakery",
            Category::Dairy => "dairy",
            Category::Fruits => "fruits",
            Category::Meat => "meat",
            Category::Other => "other",
            Category::Seafood => "seafood",
            Category::Vegetables => "vegetables",
        }
    }

    /// Case-insensitive lookup. Unknown names fall back to `Other`.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Friday,
    #[default]
    Monday,
    Saturday,
    Sunday,
    Thursday,
    Tuesday,
    Wednesday,
}

impl DayOfWeek {
    /// Alphabetical order, which is also the one-hot column order.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Friday,
        DayOfWeek::Monday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
        DayOfWeek::Thursday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
    ];

    /// Calendar order starting on Monday.
    pub const WEEK: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Friday => "friday",
            DayOfWeek::Monday => "monday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
        }
    }

    /// Case-insensitive lookup. Names outside the week give `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for incoming product data
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("current_price must be a positive number, got {0}")]
    InvalidPrice(f64),

    #[error("stock_level must be between 0 and {max}, got {value}", max = u32::MAX)]
    InvalidStock { value: i64 },

    #[error("demand_score must be between 0 and 1, got {0}")]
    DemandOutOfRange(f64),

    #[error("historical_sales must be a non-negative number, got {0}")]
    InvalidHistoricalSales(f64),
}

/// Wire name of a day outside the week
pub const UNKNOWN_DAY: &str = "unknown";

fn default_day_of_week() -> String {
    DayOfWeek::Monday.as_str().to_string()
}

/// Integer field that also accepts floats with no fractional part
fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
    }

    let value = match Number::deserialize(deserializer)? {
        Number::Int(value) => value,
        Number::Float(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => value as i64,
        Number::Float(value) => {
            return Err(de::Error::custom(format!("expected a whole number, got {}", value)));
        }
    };

    T::try_from(value).map_err(|_| de::Error::custom(format!("{} is out of range", value)))
}

/// Raw product data as it arrives over the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductData {
    pub current_price: f64,
    #[serde(deserialize_with = "whole_number")]
    pub days_to_expiry: i32,
    #[serde(deserialize_with = "whole_number")]
    pub stock_level: i64,
    pub demand_score: f64,
    pub category: String,
    #[serde(default)]
    pub historical_sales: f64,
    #[serde(default = "default_day_of_week")]
    pub day_of_week: String,
}

/// Validated, immutable view of one product at decision time.
///
/// The only way to obtain one is through [`ProductSnapshot::new`] or a
/// `TryFrom<ProductData>` conversion, so every snapshot satisfies the field
/// constraints the pricing functions rely on. A day name outside the week is
/// kept as `None` rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProductData", into = "ProductData")]
pub struct ProductSnapshot {
    current_price: f64,
    days_to_expiry: i32,
    stock_level: u32,
    demand_score: f64,
    category: Category,
    historical_sales: f64,
    day_of_week: Option<DayOfWeek>,
}

impl ProductSnapshot {
    pub fn new(
        current_price: f64,
        days_to_expiry: i32,
        stock_level: u32,
        demand_score: f64,
        category: Category,
        historical_sales: f64,
        day_of_week: impl Into<Option<DayOfWeek>>,
    ) -> Result<Self, SnapshotError> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(SnapshotError::InvalidPrice(current_price));
        }
        if !(0.0..=1.0).contains(&demand_score) {
            return Err(SnapshotError::DemandOutOfRange(demand_score));
        }
        if !historical_sales.is_finite() || historical_sales < 0.0 {
            return Err(SnapshotError::InvalidHistoricalSales(historical_sales));
        }

        Ok(Self {
            current_price,
            days_to_expiry,
            stock_level,
            demand_score,
            category,
            historical_sales,
            day_of_week: day_of_week.into(),
        })
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn days_to_expiry(&self) -> i32 {
        self.days_to_expiry
    }

    pub fn stock_level(&self) -> u32 {
        self.stock_level
    }

    pub fn demand_score(&self) -> f64 {
        self.demand_score
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn historical_sales(&self) -> f64 {
        self.historical_sales
    }

    pub fn day_of_week(&self) -> Option<DayOfWeek> {
        self.day_of_week
    }

    pub fn day_name(&self) -> &'static str {
        self.day_of_week.map_or(UNKNOWN_DAY, |day| day.as_str())
    }
}

impl TryFrom<ProductData> for ProductSnapshot {
    type Error = SnapshotError;

    fn try_from(data: ProductData) -> Result<Self, Self::Error> {
        let stock_level = u32::try_from(data.stock_level)
            .map_err(|_| SnapshotError::InvalidStock { value: data.stock_level })?;
        Self::new(
            data.current_price,
            data.days_to_expiry,
            stock_level,
            data.demand_score,
            Category::from_name(&data.category),
            data.historical_sales,
            DayOfWeek::from_name(&data.day_of_week),
        )
    }
}

impl From<ProductSnapshot> for ProductData {
    fn from(snapshot: ProductSnapshot) -> Self {
        Self {
            current_price: snapshot.current_price,
            days_to_expiry: snapshot.days_to_expiry,
            stock_level: i64::from(snapshot.stock_level),
            demand_score: snapshot.demand_score,
            category: snapshot.category.as_str().to_string(),
            historical_sales: snapshot.historical_sales,
            day_of_week: snapshot.day_name().to_string(),
        }
    }
}
