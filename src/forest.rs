//! Bagged decision-tree ensemble.
//!
//! Every tree is grown on a bootstrap resample of the training split. The
//! positive-class probability of a row is the share of trees voting for it.

use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

pub const POSITIVE_CLASS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedForest {
    n_features: usize,
    trees: Vec<DecisionTree<f64, usize>>,
}

impl BaggedForest {
    pub fn fit(records: &Array2<f64>, targets: &Array1<usize>, params: &ForestParams) -> Result<Self> {
        let n_rows = records.nrows();
        if n_rows == 0 {
            return Err(RiskError::Training("training split is empty".to_string()));
        }
        if targets.len() != n_rows {
            return Err(RiskError::Training(format!(
                "{} records but {} targets",
                n_rows,
                targets.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(RiskError::Training("ensemble needs at least one tree".to_string()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);

        for i in 0..params.n_trees {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let dataset = Dataset::new(
                records.select(Axis(0), &rows),
                targets.select(Axis(0), &rows),
            );

            let tree = DecisionTree::params()
                .max_depth(params.max_depth)
                .fit(&dataset)
                .map_err(|e| RiskError::Training(format!("tree {}: {}", i, e)))?;
            trees.push(tree);
        }

        log::debug!("Fitted {} trees on {} bootstrap rows each", trees.len(), n_rows);

        Ok(Self {
            n_features: records.ncols(),
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Share of trees voting for the positive class, per row.
    pub fn predict_proba(&self, records: &Array2<f64>) -> Result<Array1<f64>> {
        if records.ncols() != self.n_features {
            return Err(RiskError::ShapeMismatch {
                expected: self.n_features,
                actual: records.ncols(),
            });
        }
        if self.trees.is_empty() {
            return Err(RiskError::Inference("ensemble has no trees".to_string()));
        }

        let mut votes = Array1::<f64>::zeros(records.nrows());
        for tree in &self.trees {
            let labels: Array1<usize> = tree.predict(records);
            for (vote, label) in votes.iter_mut().zip(labels.iter()) {
                if *label == POSITIVE_CLASS {
                    *vote += 1.0;
                }
            }
        }

        Ok(votes / self.trees.len() as f64)
    }

    /// Majority vote; ties go to the negative class.
    pub fn predict(&self, records: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(self
            .predict_proba(records)?
            .mapv(|p| if is_positive(p) { POSITIVE_CLASS } else { 0 }))
    }
}

/// Label implied by a vote share.
pub fn is_positive(probability: f64) -> bool {
    probability > 0.5
}

pub fn calculate_accuracy(predictions: &Array1<usize>, targets: &Array1<usize>) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    predictions.iter()
        .zip(targets.iter())
        .filter(|(pred, actual)| pred == actual)
        .count() as f64 / targets.len() as f64
}
