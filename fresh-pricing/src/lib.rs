pub mod calculator;
pub mod explainer;
pub mod labels;
pub mod pipeline;

pub use calculator::{category_multiplier, PricingBounds, RuleBasedCalculator};
pub use explainer::explain;
pub use labels::{standard_normal, SyntheticLabelGenerator, UniformFactor};
pub use pipeline::{MultiplierPipeline, PricingRule, RuleCondition, Stage};
