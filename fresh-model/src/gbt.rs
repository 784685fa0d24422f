//! Gradient boosted regression trees.
//!
//! Squared-error boosting with depth-limited trees, row subsampling and
//! per-tree column subsampling. Leaf weights and split gains use an L2 term
//! on the leaf (`sum / (count + lambda)`), so small leaves are shrunk toward
//! zero. Trees are stored as flat node arrays and serialise to plain JSON.

use crate::model::{ModelError, PriceModel};
use crate::training::TrainingError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MIN_SPLIT_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Fraction of columns sampled for each tree
    pub colsample_bytree: f64,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_samples_leaf: 1,
            l2_regularization: 1.0,
            seed: 42,
        }
    }
}

impl BoostingParams {
    fn validate(&self) -> Result<(), TrainingError> {
        let invalid = |msg: &str| Err(TrainingError::InvalidParams(msg.to_string()));

        if self.n_estimators == 0 {
            return invalid("n_estimators must be at least 1");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning_rate must be positive");
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid("subsample must be in (0, 1]");
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return invalid("colsample_bytree must be in (0, 1]");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf must be at least 1");
        }
        if !(self.l2_regularization >= 0.0 && self.l2_regularization.is_finite()) {
            return invalid("l2_regularization must be non-negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("Tree has no nodes")]
    Empty,

    #[error("Node {node} points to child {child}, which is not a later node of {len}")]
    InvalidChild { node: usize, child: usize, len: usize },
}

/// Flat node array. Children always come after their parent, which is
/// checked on deserialisation so traversal terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeNodes")]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

#[derive(Deserialize)]
struct TreeNodes {
    nodes: Vec<TreeNode>,
}

impl TryFrom<TreeNodes> for RegressionTree {
    type Error = TreeError;

    fn try_from(raw: TreeNodes) -> Result<Self, Self::Error> {
        let len = raw.nodes.len();
        if len == 0 {
            return Err(TreeError::Empty);
        }

        for (node, entry) in raw.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = entry {
                if let Some(&child) = [left, right].into_iter().find(|&&child| child <= node || child >= len) {
                    return Err(TreeError::InvalidChild { node, child, len });
                }
            }
        }

        Ok(Self { nodes: raw.nodes })
    }
}

impl RegressionTree {
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).copied().unwrap_or(f64::NAN);
                    index = if value <= *threshold { *left } else { *right };
                }
                // malformed tree
                None => return f64::NAN,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], index: usize) -> usize {
            match nodes.get(index) {
                Some(TreeNode::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    residuals: &'a [f64],
    columns: &'a [usize],
    params: &'a BoostingParams,
    nodes: Vec<TreeNode>,
    importances: &'a mut [f64],
}

impl TreeBuilder<'_> {
    fn score(&self, sum: f64, count: usize) -> f64 {
        sum * sum / (count as f64 + self.params.l2_regularization)
    }

    fn leaf_value(&self, sum: f64, count: usize) -> f64 {
        let denominator = count as f64 + self.params.l2_regularization;
        if denominator > 0.0 {
            self.params.learning_rate * sum / denominator
        } else {
            0.0
        }
    }

    fn build(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let sum: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: self.leaf_value(sum, rows.len()),
        });

        if depth >= self.params.max_depth || rows.len() < 2 * self.params.min_samples_leaf {
            return index;
        }

        let Some(split) = self.best_split(rows, sum) else {
            return index;
        };

        let mid = partition(rows, |r| self.features[r][split.feature] <= split.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);

        self.importances[split.feature] += split.gain;
        self.nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&self, rows: &[usize], total: f64) -> Option<SplitCandidate> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent_score = self.score(total, n);
        let mut best: Option<SplitCandidate> = None;

        for &feature in self.columns {
            let mut column: Vec<(f64, f64)> = rows
                .iter()
                .map(|&r| (self.features[r][feature], self.residuals[r]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += column[i].1;
                let left_count = i + 1;
                let (value, next) = (column[i].0, column[i + 1].0);

                if value == next || left_count < min_leaf || n - left_count < min_leaf {
                    continue;
                }

                let gain = self.score(left_sum, left_count) + self.score(total - left_sum, n - left_count)
                    - parent_score;

                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let midpoint = (value + next) / 2.0;
                    best = Some(SplitCandidate {
                        feature,
                        threshold: if midpoint < next { midpoint } else { value },
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Moves rows matching `pred` to the front, returns how many matched
fn partition(rows: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0;
    for i in 0..rows.len() {
        if pred(rows[i]) {
            rows.swap(boundary, i);
            boundary += 1;
        }
    }
    boundary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl GradientBoostedTrees {
    pub const MODEL_TYPE: &'static str = "GradientBoostedTrees";

    pub fn fit(features: &[Vec<f64>], targets: &[f64], params: &BoostingParams) -> Result<Self, TrainingError> {
        params.validate()?;

        if features.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if features.len() != targets.len() {
            return Err(TrainingError::LengthMismatch {
                rows: features.len(),
                targets: targets.len(),
            });
        }
        let n_features = features[0].len();
        if let Some((row, bad)) = features.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(TrainingError::RaggedRow {
                row,
                expected: n_features,
                actual: bad.len(),
            });
        }

        let n = features.len();
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let base_score = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let rows_per_tree = ((n as f64 * params.subsample).ceil() as usize).clamp(1, n);
        let cols_per_tree = ((n_features as f64 * params.colsample_bytree).ceil() as usize).clamp(1, n_features.max(1));

        let mut all_rows: Vec<usize> = (0..n).collect();
        let mut all_columns: Vec<usize> = (0..n_features).collect();

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = targets.iter().zip(&predictions).map(|(y, p)| y - p).collect();

            all_rows.shuffle(&mut rng);
            let mut rows = all_rows[..rows_per_tree].to_vec();

            all_columns.shuffle(&mut rng);
            let mut columns = all_columns[..cols_per_tree.min(n_features)].to_vec();
            columns.sort_unstable();

            let mut builder = TreeBuilder {
                features,
                residuals: &residuals,
                columns: &columns,
                params,
                nodes: Vec::new(),
                importances: &mut importances,
            };
            builder.build(&mut rows, 0);
            let tree = RegressionTree { nodes: builder.nodes };

            for (prediction, row) in predictions.iter_mut().zip(features) {
                *prediction += tree.predict(row);
            }
            trees.push(tree);
        }

        let total_gain: f64 = importances.iter().sum();
        if total_gain > 0.0 {
            importances.iter_mut().for_each(|g| *g /= total_gain);
        }

        Ok(Self {
            base_score,
            n_features,
            trees,
            feature_importances: importances,
        })
    }

    /// Normalised split gain per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl PriceModel for GradientBoostedTrees {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        Ok(self.base_score + self.trees.iter().map(|tree| tree.predict(features)).sum::<f64>())
    }

    fn model_type(&self) -> &str {
        Self::MODEL_TYPE
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}
