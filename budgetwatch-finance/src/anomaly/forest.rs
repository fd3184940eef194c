//! Isolation forest: an ensemble of random partitioning trees.
//!
//! Each tree is grown on a subsample drawn without replacement. A node picks
//! a random feature that still varies inside it and a uniform split point
//! between that feature's min and max. Points that get isolated after few
//! splits are anomalous. Scores follow the usual normalization
//! `2^(-E[h(x)] / c(n))`, and the outlier threshold is calibrated on the
//! training scores from the contamination fraction.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use super::ModelError;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Default cap on the per-tree subsample
pub const DEFAULT_MAX_SAMPLES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Upper bound on rows per tree; the effective size is `min(max_samples, n)`
    pub max_samples: usize,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// A single isolation tree stored as a flat node arena; the root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(data: &[Vec<f64>], sample: &mut [usize], max_depth: usize, rng: &mut Pcg64Mcg) -> Self {
        let mut tree = IsolationTree { nodes: Vec::new() };
        let n_features = data.first().map(Vec::len).unwrap_or(0);
        let mut features: Vec<usize> = (0..n_features).collect();
        tree.grow_node(data, sample, 0, max_depth, &mut features, rng);
        tree
    }

    fn grow_node(
        &mut self,
        data: &[Vec<f64>],
        idx: &mut [usize],
        depth: usize,
        max_depth: usize,
        features: &mut [usize],
        rng: &mut Pcg64Mcg,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: idx.len() });
        if depth >= max_depth || idx.len() <= 1 {
            return id;
        }

        // First feature, in random order, that is not constant in this node.
        features.shuffle(rng);
        let split = features.iter().find_map(|&f| {
            let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(data[i][f]), hi.max(data[i][f]))
            });
            (lo < hi).then_some((f, lo, hi))
        });
        let Some((feature, lo, hi)) = split else {
            return id;
        };

        let threshold = lo + rng.gen_range(0.0..1.0) * (hi - lo);
        let mid = partition(idx, |i| data[i][feature] <= threshold);
        let (left_idx, right_idx) = idx.split_at_mut(mid);

        let left = self.grow_node(data, left_idx, depth + 1, max_depth, features, rng);
        let right = self.grow_node(data, right_idx, depth + 1, max_depth, features, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Children must come after their parent and inside the arena, which
    /// also rules out cycles.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            else {
                continue;
            };
            if *feature >= n_features {
                return Err(format!("node {id} splits on feature {feature} of {n_features}"));
            }
            if !threshold.is_finite() {
                return Err(format!("node {id} has threshold {threshold}"));
            }
            for child in [*left, *right] {
                if child <= id || child >= self.nodes.len() {
                    return Err(format!("node {id} points at node {child}"));
                }
            }
        }
        Ok(())
    }

    fn path_length(&self, x: &[f64]) -> f64 {
        let mut id = 0;
        let mut depth = 0usize;
        loop {
            match &self.nodes[id] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1;
                }
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
            }
        }
    }
}

/// Move every index satisfying `pred` to the front; returns the count.
fn partition(idx: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..idx.len() {
        if pred(idx[j]) {
            idx.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

/// Expected path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile of `values`, `q` in `[0, 1]`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// A fitted isolation forest with its calibrated outlier threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    params: ForestParams,
    n_features: usize,
    sample_size: usize,
    trees: Vec<IsolationTree>,
    /// Scores strictly above this are outliers
    threshold: f64,
}

impl IsolationForest {
    /// Fit on `data`, one row per observation. All rows must have the same
    /// width and contain only finite values.
    pub fn fit(data: &[Vec<f64>], params: ForestParams) -> Result<Self, ModelError> {
        if data.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let n_features = data[0].len();
        check_rows(data, n_features)?;

        let sample_size = params.max_samples.clamp(1, data.len());
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..params.n_estimators.max(1))
            .map(|t| {
                // Independent, reproducible stream per tree.
                let seed = params.seed ^ (t as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
                let mut rng = Pcg64Mcg::seed_from_u64(seed);
                let mut sample = rand::seq::index::sample(&mut rng, data.len(), sample_size).into_vec();
                IsolationTree::grow(data, &mut sample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest {
            params,
            n_features,
            sample_size,
            trees,
            threshold: f64::INFINITY,
        };

        let scores: Vec<f64> = data.iter().map(|x| forest.score_one(x)).collect();
        forest.threshold = quantile(&scores, 1.0 - params.contamination);
        log::debug!(
            "fitted isolation forest: {} trees, {} samples/tree, threshold {:.4}",
            forest.trees.len(),
            sample_size,
            forest.threshold
        );
        Ok(forest)
    }

    /// Structural check for a forest read back from disk; scoring a forest
    /// that fails it could index out of bounds or never terminate.
    pub fn validate(&self) -> Result<(), ModelError> {
        let malformed = |reason: String| Err(ModelError::MalformedForest(reason));
        if self.trees.is_empty() {
            return malformed("no trees".to_string());
        }
        if self.sample_size == 0 {
            return malformed("empty subsample".to_string());
        }
        if !self.threshold.is_finite() {
            return malformed(format!("threshold {}", self.threshold));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| ModelError::MalformedForest(format!("tree {t}: {reason}")))?;
        }
        Ok(())
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score_one(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(x)).sum();
        let mean_depth = total / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        let exponent = if norm > 0.0 { mean_depth / norm } else { 1.0 };
        2f64.powf(-exponent)
    }

    /// Anomaly score in `(0, 1]` per row; higher is more anomalous.
    pub fn score(&self, data: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        check_rows(data, self.n_features)?;
        Ok(data.iter().map(|x| self.score_one(x)).collect())
    }

    /// `true` for rows classified as outliers.
    pub fn predict(&self, data: &[Vec<f64>]) -> Result<Vec<bool>, ModelError> {
        Ok(self
            .score(data)?
            .into_iter()
            .map(|s| s > self.threshold)
            .collect())
    }
}

fn check_rows(data: &[Vec<f64>], width: usize) -> Result<(), ModelError> {
    for (row, x) in data.iter().enumerate() {
        if x.len() != width {
            return Err(ModelError::FeatureMismatch {
                expected: width,
                actual: x.len(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteFeature { row });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut data: Vec<Vec<f64>> = (0..200)
            .map(|i| {
                let jitter = (i % 7) as f64 * 0.5;
                vec![20.0 + jitter, (i % 3) as f64, (i % 7) as f64]
            })
            .collect();
        data.push(vec![5000.0, 40.0, 3.0]);
        data
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2448).abs() < 1e-3, "c(256) = {c256}");
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 4.0);
        assert!((quantile(&v, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_flags_obvious_outlier() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, ForestParams::default()).unwrap();
        let flags = forest.predict(&data).unwrap();

        assert!(flags[200], "extreme row should be an outlier");
        let flagged = flags.iter().filter(|f| **f).count();
        assert!(flagged <= 3, "contamination 1% should flag few rows, got {flagged}");

        let scores = forest.score(&data).unwrap();
        let max = scores.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(scores[200], max);
    }

    #[test]
    fn test_same_seed_same_model() {
        let data = cluster_with_outlier();
        let a = IsolationForest::fit(&data, ForestParams::default()).unwrap();
        let b = IsolationForest::fit(&data, ForestParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fitted_forest_validates() {
        let forest = IsolationForest::fit(&cluster_with_outlier(), ForestParams::default()).unwrap();
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        let fitted = IsolationForest::fit(&cluster_with_outlier(), ForestParams::default()).unwrap();
        fn with_root(forest: &IsolationForest, edit: impl FnOnce(&mut Node)) -> IsolationForest {
            let mut forest = forest.clone();
            assert!(matches!(forest.trees[0].nodes[0], Node::Split { .. }));
            edit(&mut forest.trees[0].nodes[0]);
            forest
        }

        let out_of_range = with_root(&fitted, |n: &mut Node| {
            if let Node::Split { left, .. } = n {
                *left = 99_999;
            }
        });
        assert!(matches!(out_of_range.validate(), Err(ModelError::MalformedForest(_))));

        let cyclic = with_root(&fitted, |n: &mut Node| {
            if let Node::Split { right, .. } = n {
                *right = 0;
            }
        });
        assert!(cyclic.validate().is_err());

        let bad_feature = with_root(&fitted, |n: &mut Node| {
            if let Node::Split { feature, .. } = n {
                *feature = 7;
            }
        });
        assert!(bad_feature.validate().is_err());

        let mut no_trees = fitted.clone();
        no_trees.trees.clear();
        assert!(no_trees.validate().is_err());

        let mut nan_threshold = fitted.clone();
        nan_threshold.threshold = f64::NAN;
        assert!(nan_threshold.validate().is_err());
    }

    #[test]
    fn test_constant_data_is_never_outlier() {
        let data = vec![vec![1.0, 1.0]; 20];
        let forest = IsolationForest::fit(&data, ForestParams::default()).unwrap();
        assert!(forest.predict(&data).unwrap().iter().all(|f| !f));
    }

    #[test]
    fn test_single_row() {
        let data = vec![vec![12.0, 0.0, 1.0]];
        let forest = IsolationForest::fit(&data, ForestParams::default()).unwrap();
        assert_eq!(forest.score(&data).unwrap(), vec![0.5]);
        assert_eq!(forest.predict(&data).unwrap(), vec![false]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            IsolationForest::fit(&[], ForestParams::default()),
            Err(ModelError::EmptyTrainingSet)
        ));

        let forest = IsolationForest::fit(&cluster_with_outlier(), ForestParams::default()).unwrap();
        assert!(matches!(
            forest.predict(&[vec![1.0, 2.0]]),
            Err(ModelError::FeatureMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            forest.predict(&[vec![1.0, f64::NAN, 0.0]]),
            Err(ModelError::NonFiniteFeature { row: 0 })
        ));
    }
}
