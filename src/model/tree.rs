//! Regression tree used as the random-forest base learner

use crate::error::{AdmitError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Node of a fitted regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Variance-reduction regression tree.
///
/// Splits minimize within-node variance (the MSE criterion); leaf predictions
/// are the mean of the targets that reach the leaf. All features are scanned
/// at every split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(AdmitError::InvalidTrainingData("target is empty".to_string()));
        }
        if n_samples != y.len() {
            return Err(AdmitError::Shape {
                expected: format!("{} target rows", n_samples),
                actual: format!("{} target rows", y.len()),
            });
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let node_stats = Stats::collect(y, indices);

        let at_max_depth = self.max_depth.map_or(false, |d| depth >= d);
        if n_samples < self.min_samples_split || at_max_depth || node_stats.variance() < 1e-12 {
            return TreeNode::Leaf {
                value: node_stats.mean(),
                n_samples,
            };
        }

        let best = self.find_best_split(x, y, indices, &node_stats);
        let Some((feature_idx, threshold, gain)) = best else {
            return TreeNode::Leaf {
                value: node_stats.mean(),
                n_samples,
            };
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        if left_idx.len() < self.min_samples_leaf || right_idx.len() < self.min_samples_leaf {
            return TreeNode::Leaf {
                value: node_stats.mean(),
                n_samples,
            };
        }

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_node(x, y, &left_idx, depth + 1, importances));
        let right = Box::new(self.build_node(x, y, &right_idx, depth + 1, importances));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Scan every feature for the threshold with the largest variance
    /// reduction. Returns (feature, threshold, gain) or `None` when no split
    /// improves on the parent.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent: &Stats,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len() as f64;
        let parent_impurity = parent.variance();
        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in 0..x.ncols() {
            // sort samples by feature value, then sweep candidate thresholds
            // with running sums so each threshold costs O(1)
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_by(|&a, &b| {
                x[[a, feature_idx]]
                    .partial_cmp(&x[[b, feature_idx]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left = Stats::default();
            let mut right = parent.clone();

            for w in 0..order.len() - 1 {
                let yi = y[order[w]];
                left.push(yi);
                right.pop(yi);

                let here = x[[order[w], feature_idx]];
                let next = x[[order[w + 1], feature_idx]];
                if here == next {
                    continue;
                }

                if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left.count as f64 * left.variance()
                    + right.count as f64 * right.variance())
                    / n;
                let gain = parent_impurity - weighted;

                if gain > 0.0 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, (here + next) / 2.0, gain));
                }
            }
        }

        best
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(AdmitError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| Self::predict_row(root, &x.row(i).to_vec()))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn predict_row(node: &TreeNode, row: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_row(left, row)
                } else {
                    Self::predict_row(right, row)
                }
            }
        }
    }

    /// Impurity-decrease importances, normalized to sum to one.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

/// Running count/sum/sum-of-squares for incremental variance.
#[derive(Debug, Clone, Default)]
struct Stats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl Stats {
    fn collect(y: &Array1<f64>, indices: &[usize]) -> Self {
        let mut stats = Self::default();
        for &i in indices {
            stats.push(y[i]);
        }
        stats
    }

    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.sq_sum += v * v;
    }

    fn pop(&mut self, v: f64) {
        self.count -= 1;
        self.sum -= v;
        self.sq_sum -= v * v;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        // guard against negative values from floating-point cancellation
        (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fits_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 5.0, 5.0, 5.0];

        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();

        let preds = tree.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-9, "pred {} vs {}", p, t);
        }
    }

    #[test]
    fn test_constant_target_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];

        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.depth(), 1);
        let preds = tree.predict(&x).unwrap();
        assert_eq!(preds, array![4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let mut tree = RegressionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!(tree.depth() <= 3); // root + two split levels
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let x = array![
            [1.0, 0.5],
            [2.0, 0.5],
            [3.0, 0.5],
            [4.0, 0.5],
            [5.0, 0.5],
        ];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();

        let imp = tree.feature_importances().unwrap();
        assert!(imp[0] > imp[1]);
        assert_eq!(imp[1], 0.0); // constant feature never splits
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        let err = RegressionTree::new().fit(&x, &y).unwrap_err();
        assert!(matches!(err, AdmitError::InvalidTrainingData(_)));
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = RegressionTree::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]).unwrap_err(),
            AdmitError::ModelNotFitted
        ));
    }
}
