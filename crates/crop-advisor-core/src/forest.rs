//! Seeded random forest over smartcore decision trees.
//!
//! Each tree is a `smartcore` CART classifier (Gini, all features) fitted
//! on a bootstrap sample of the training rows. The bootstrap draws come
//! from a ChaCha RNG seeded with [`ForestParams::seed`], and smartcore's
//! tree induction is itself deterministic, so a forest is a pure function
//! of its training data and parameters.
//!
//! Class probabilities are the fraction of trees voting for each class.
//! Feature importance is out-of-bag permutation importance: the accuracy
//! a tree loses on the rows it never saw when one feature column is
//! shuffled, averaged over trees and normalized to sum to one.

use anyhow::{anyhow, bail, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};

/// Ensemble hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

/// One fitted tree. Labels are class indices stored as `u32`.
pub type Tree = DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// A trained, immutable random forest.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fits the forest on rows `x` with class indices `y` in `0..n_classes`.
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            bail!("cannot fit a forest on zero rows");
        }
        if x.len() != y.len() {
            bail!("{} rows but {} targets", x.len(), y.len());
        }
        if params.n_trees == 0 {
            bail!("n_trees must be > 0");
        }
        let n_features = x[0].len();
        if n_features == 0 {
            bail!("rows have no features");
        }
        if let Some(row) = x.iter().position(|r| r.len() != n_features) {
            bail!("row {} has {} features, expected {}", row, x[row].len(), n_features);
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            bail!("target {} out of range for {} classes", bad, n_classes);
        }
        let tree_params = DecisionTreeClassifierParameters {
            criterion: SplitCriterion::Gini,
            max_depth: Some(
                u16::try_from(params.max_depth).map_err(|_| anyhow!("max_depth {} is too large", params.max_depth))?,
            ),
            min_samples_leaf: params.min_samples_leaf,
            min_samples_split: params.min_samples_split,
            seed: Some(params.seed),
        };

        let mut forest_rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        let mut importance_sum = vec![0.0; n_features];
        let mut scored_trees = 0usize;

        for t in 0..params.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(forest_rng.gen());
            let mut in_bag = vec![false; x.len()];
            let sample: Vec<usize> = (0..x.len())
                .map(|_| {
                    let i = rng.gen_range(0..x.len());
                    in_bag[i] = true;
                    i
                })
                .collect();

            let records = matrix(sample.iter().map(|&i| x[i].clone()).collect());
            let targets: Vec<u32> = sample.iter().map(|&i| y[i] as u32).collect();
            let tree = DecisionTreeClassifier::fit(&records, &targets, tree_params.clone())
                .map_err(|e| anyhow!("tree {}: {}", t, e))?;

            let oob: Vec<usize> = (0..x.len()).filter(|&i| !in_bag[i]).collect();
            if let Some(drops) = permutation_drops(&tree, x, y, &oob, &mut rng)? {
                for (acc, d) in importance_sum.iter_mut().zip(drops) {
                    *acc += d;
                }
                scored_trees += 1;
            }
            trees.push(tree);
        }

        let mut feature_importances = importance_sum;
        if scored_trees > 0 {
            feature_importances.iter_mut().for_each(|v| *v /= scored_trees as f64);
        }
        let total: f64 = feature_importances.iter().sum();
        if total > 0.0 {
            feature_importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            trees,
            n_features,
            n_classes,
            feature_importances,
        })
    }

    /// Fraction of trees voting for each class.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.n_features {
            bail!("expected {} features, got {}", self.n_features, x.len());
        }
        let row = matrix(vec![x.to_vec()]);
        let mut proba = vec![0.0; self.n_classes];
        for (t, tree) in self.trees.iter().enumerate() {
            let class = predict_rows(tree, &row)?[0] as usize;
            let slot = proba
                .get_mut(class)
                .ok_or_else(|| anyhow!("tree {} voted for unknown class {}", t, class))?;
            *slot += 1.0;
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    /// Most probable class; the lowest index wins ties.
    pub fn predict(&self, x: &[f64]) -> Result<usize> {
        let proba = self.predict_proba(x)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(best)
    }

    /// Out-of-bag permutation importances, one per feature.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Consistency checks for a forest read back from disk: every tree
    /// must answer a query and vote for a known class.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            bail!("forest has no trees");
        }
        if self.n_classes == 0 || self.n_features == 0 {
            bail!("forest has no classes or no features");
        }
        if self.feature_importances.len() != self.n_features {
            bail!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            );
        }
        if self.feature_importances.iter().any(|v| !v.is_finite() || *v < 0.0) {
            bail!("feature importances must be finite and non-negative");
        }
        let origin = matrix(vec![vec![0.0; self.n_features]]);
        for (t, tree) in self.trees.iter().enumerate() {
            let class = predict_rows(tree, &origin)?[0] as usize;
            if class >= self.n_classes {
                bail!("tree {} predicts class {} of {}", t, class, self.n_classes);
            }
        }
        Ok(())
    }
}

fn matrix(rows: Vec<Vec<f64>>) -> DenseMatrix<f64> {
    DenseMatrix::from_2d_vec(&rows)
}

fn predict_rows(tree: &Tree, rows: &DenseMatrix<f64>) -> Result<Vec<u32>> {
    tree.predict(rows).map_err(|e| anyhow!("tree prediction failed: {}", e))
}

/// Accuracy lost on the out-of-bag rows when each feature in turn is
/// shuffled among them. `None` when the tree has no out-of-bag rows.
fn permutation_drops(
    tree: &Tree,
    x: &[Vec<f64>],
    y: &[usize],
    oob: &[usize],
    rng: &mut ChaCha8Rng,
) -> Result<Option<Vec<f64>>> {
    if oob.is_empty() {
        return Ok(None);
    }
    let rows: Vec<Vec<f64>> = oob.iter().map(|&i| x[i].clone()).collect();
    let truth: Vec<usize> = oob.iter().map(|&i| y[i]).collect();
    let accuracy = |predicted: Vec<u32>| {
        let hits = predicted
            .iter()
            .zip(&truth)
            .filter(|(p, t)| **p as usize == **t)
            .count();
        hits as f64 / truth.len() as f64
    };

    let baseline = accuracy(predict_rows(tree, &matrix(rows.clone()))?);
    let n_features = rows[0].len();
    let mut drops = Vec::with_capacity(n_features);
    for f in 0..n_features {
        let mut column: Vec<f64> = rows.iter().map(|r| r[f]).collect();
        column.shuffle(rng);
        let permuted: Vec<Vec<f64>> = rows
            .iter()
            .zip(column)
            .map(|(r, v)| {
                let mut r = r.clone();
                r[f] = v;
                r
            })
            .collect();
        let score = accuracy(predict_rows(tree, &matrix(permuted))?);
        drops.push((baseline - score).max(0.0));
    }
    Ok(Some(drops))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated clusters on feature 0; feature 1 is noise.
    fn two_clusters() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            x.push(vec![i as f64 * 0.1, (i % 3) as f64]);
            y.push(0);
            x.push(vec![10.0 + i as f64 * 0.1, (i % 3) as f64]);
            y.push(1);
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_separates_clusters() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        assert_eq!(forest.predict(&[0.5, 1.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[10.5, 1.0]).unwrap(), 1);
        let p = forest.predict_proba(&[10.5, 1.0]).unwrap();
        assert!(p[1] > 0.9, "{:?}", p);
    }

    #[test]
    fn test_proba_sums_to_one() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        for point in [[0.0, 0.0], [5.0, 1.0], [7.3, 2.0], [100.0, -4.0]] {
            let sum: f64 = forest.predict_proba(&point).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum = {}", sum);
        }
    }

    #[test]
    fn test_importance_favours_informative_feature() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        let imp = forest.feature_importances();
        assert_eq!(imp.len(), 2);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1], "{:?}", imp);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_clusters();
        let a = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        let b = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    #[test]
    fn test_uses_requested_tree_count() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        assert_eq!(forest.trees().len(), 15);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.n_classes(), 2);
    }

    #[test]
    fn test_min_samples_split_makes_stumps() {
        let (x, y) = two_clusters();
        let params = ForestParams {
            n_trees: 3,
            min_samples_split: 1000,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, 2, &params).unwrap();
        // A stump answers the same class everywhere, so shuffling a
        // column never costs accuracy.
        assert!(forest.feature_importances().iter().all(|v| *v == 0.0));
        assert_eq!(
            forest.predict_proba(&[0.0, 0.0]).unwrap(),
            forest.predict_proba(&[10.5, 2.0]).unwrap()
        );
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(RandomForest::fit(&[], &[], 2, &small_params()).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[0, 1], 2, &small_params()).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[5], 2, &small_params()).is_err());
        assert!(RandomForest::fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1], 2, &small_params()).is_err());
        let params = ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        };
        assert!(RandomForest::fit(&[vec![1.0], vec![2.0]], &[0, 1], 2, &params).is_err());
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        assert!(forest.predict_proba(&[1.0]).is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_predictions() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForest = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(
            forest.predict_proba(&[4.95, 1.0]).unwrap(),
            back.predict_proba(&[4.95, 1.0]).unwrap()
        );
    }

    #[test]
    fn test_validate_rejects_missing_classes() {
        let (x, y) = two_clusters();
        let mut forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        forest.validate().unwrap();
        forest.n_classes = 0;
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_importances() {
        let (x, y) = two_clusters();
        let mut forest = RandomForest::fit(&x, &y, 2, &small_params()).unwrap();
        forest.feature_importances = vec![f64::NAN, 0.5];
        assert!(forest.validate().is_err());
        forest.feature_importances = vec![1.0];
        assert!(forest.validate().is_err());
    }
}
