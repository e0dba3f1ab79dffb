use std::fmt;

use crate::data::Instances;
use crate::errors::TreeError;
use crate::utils::{self, column, multiply};

/// A trained leaf, evaluated against a full query vector.
pub trait FittedLeaf: fmt::Debug + fmt::Display + Send + Sync {
    fn predict(&self, features: &[f64]) -> f64;
}

/// Leaf-fitting policy injected into the trainer. `fit_leaf` produces
/// the value stored at a leaf; `error` scores a candidate subset during
/// split search. The two tree variants differ only in this policy.
pub trait LeafModel: Send + Sync {
    type Fitted: FittedLeaf;

    fn fit_leaf(&self, set: &Instances) -> Result<Self::Fitted, TreeError>;

    fn error(&self, set: &Instances) -> Result<f64, TreeError>;
}

/// Constant-leaf policy: a leaf predicts the mean target of its subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantModel;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantLeaf {
    pub value: f64,
}

impl FittedLeaf for ConstantLeaf {
    fn predict(&self, _features: &[f64]) -> f64 {
        self.value
    }
}

impl fmt::Display for ConstantLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.value)
    }
}

impl LeafModel for ConstantModel {
    type Fitted = ConstantLeaf;

    fn fit_leaf(&self, set: &Instances) -> Result<ConstantLeaf, TreeError> {
        Ok(ConstantLeaf {
            value: utils::mean(&set.target_values()),
        })
    }

    /// Sum of squared deviations from the subset mean, i.e. the
    /// uncorrected variance scaled back up by the row count.
    fn error(&self, set: &Instances) -> Result<f64, TreeError> {
        let targets = set.target_values();
        Ok(utils::variance(&targets) * targets.len() as f64)
    }
}

/// Linear-leaf policy: a leaf stores least-squares weights over the
/// subset and predicts their dot product with the query vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearModel;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearLeaf {
    pub weights: Vec<f64>,
}

impl FittedLeaf for LinearLeaf {
    fn predict(&self, features: &[f64]) -> f64 {
        self.weights.iter().zip(features).map(|(w, x)| w * x).sum()
    }
}

impl fmt::Display for LinearLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, w) in self.weights.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{w}")?;
        }
        write!(f, "]")
    }
}

impl LeafModel for LinearModel {
    type Fitted = LinearLeaf;

    fn fit_leaf(&self, set: &Instances) -> Result<LinearLeaf, TreeError> {
        let x = feature_rows(set);
        let weights = utils::least_squares(&x, &set.target_values())?;
        Ok(LinearLeaf { weights })
    }

    /// Residual sum of squares of the fitted weights re-applied to the
    /// subset they were fit on.
    fn error(&self, set: &Instances) -> Result<f64, TreeError> {
        let x = feature_rows(set);
        let targets = set.target_values();
        let weights = utils::least_squares(&x, &targets)?;
        let predicted = multiply(&x, &column(&weights))?;
        Ok(targets
            .iter()
            .zip(predicted.iter())
            .map(|(y, row)| {
                let residual = y - row[0];
                residual * residual
            })
            .sum())
    }
}

fn feature_rows(set: &Instances) -> Vec<Vec<f64>> {
    set.rows().map(<[f64]>::to_vec).collect()
}
