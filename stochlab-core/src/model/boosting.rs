//! Histogram-based gradient boosting regressor (least-squares loss).
//!
//! Fit: bin the features once, start from the mean target, then for each
//! iteration grow one tree on the current residuals and add its shrunk
//! output to the running prediction. Training stops early when a tree cannot
//! find any split.

use super::binning::{BinMapper, MAX_BINS_LIMIT};
use super::tree::{self, GrowerParams, Tree};
use super::{ModelError, Regressor, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub max_leaf_nodes: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    pub max_bins: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 100,
            max_leaf_nodes: 31,
            max_depth: None,
            min_samples_leaf: 20,
            l2_regularization: 0.0,
            max_bins: 255,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, reason: &str| ModelError::InvalidParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(invalid("learning_rate", "must be a positive finite number"));
        }
        if self.max_iter == 0 {
            return Err(invalid("max_iter", "must be at least 1"));
        }
        if self.max_leaf_nodes < 2 {
            return Err(invalid("max_leaf_nodes", "must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(invalid("min_samples_leaf", "must be at least 1"));
        }
        if self.l2_regularization.is_nan() || self.l2_regularization < 0.0 {
            return Err(invalid("l2_regularization", "must be non-negative"));
        }
        if !(2..=MAX_BINS_LIMIT).contains(&self.max_bins) {
            return Err(invalid("max_bins", "must be between 2 and 255"));
        }
        Ok(())
    }

    fn grower(&self) -> GrowerParams {
        GrowerParams {
            learning_rate: self.learning_rate,
            max_leaf_nodes: self.max_leaf_nodes,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            l2_regularization: self.l2_regularization,
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    baseline: f64,
    n_features: usize,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone)]
pub struct HistGradientBoostingRegressor {
    params: BoostingParams,
    fitted: Option<Fitted>,
}

impl Default for HistGradientBoostingRegressor {
    fn default() -> Self {
        Self {
            params: BoostingParams::default(),
            fitted: None,
        }
    }
}

impl HistGradientBoostingRegressor {
    pub fn new(params: BoostingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            fitted: None,
        })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Number of boosting iterations actually run.
    pub fn n_iter(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.trees.len())
    }

    /// Mean target the ensemble starts from.
    pub fn baseline(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.baseline)
    }
}

impl Regressor for HistGradientBoostingRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if x.len() != y.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(ModelError::ShapeMismatch("rows have no features".into()));
        }
        if let Some(i) = x.iter().position(|row| row.len() != n_features) {
            return Err(ModelError::ShapeMismatch(format!(
                "row {i} has {} features, expected {n_features}",
                x[i].len()
            )));
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::InvalidTarget(format!(
                "target at row {i} is {}",
                y[i]
            )));
        }

        let mapper = BinMapper::fit(x, n_features, self.params.max_bins);
        let binned = mapper.transform(x);
        let grower = self.params.grower();

        let n = y.len();
        let baseline = y.iter().sum::<f64>() / n as f64;
        let mut raw = vec![baseline; n];
        let mut gradients = vec![0.0; n];
        let mut trees = Vec::new();

        for _ in 0..self.params.max_iter {
            for i in 0..n {
                gradients[i] = raw[i] - y[i];
            }

            let tree = tree::grow(&binned, &mapper, &gradients, &grower);
            if tree.is_single_leaf() {
                break;
            }

            for (i, r) in raw.iter_mut().enumerate() {
                *r += tree.predict_binned(&binned, &mapper, i);
            }
            trees.push(tree);
        }

        debug!(
            samples = n,
            n_features,
            iterations = trees.len(),
            baseline,
            "gradient boosting fit complete"
        );

        self.fitted = Some(Fitted {
            baseline,
            n_features,
            trees,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;

        x.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != fitted.n_features {
                    return Err(ModelError::ShapeMismatch(format!(
                        "row {i} has {} features, model was fit on {}",
                        row.len(),
                        fitted.n_features
                    )));
                }
                Ok(fitted.baseline + fitted.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            })
            .collect()
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}
