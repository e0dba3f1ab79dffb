use std::fmt;

use rayon::prelude::*;

use crate::data::Instances;
use crate::errors::TreeError;
use crate::leaf::FittedLeaf;

/// A node of a trained tree. Internal nodes re-derive the training
/// split decision at prediction time: rows at or above the threshold
/// descend left, the rest descend right.
#[derive(Debug)]
pub enum Node<L> {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<Node<L>>,
        right: Box<Node<L>>,
    },
    Leaf(L),
}

impl<L: FittedLeaf> Node<L> {
    fn value(&self, features: &[f64]) -> f64 {
        match self {
            Node::Leaf(leaf) => leaf.predict(features),
            Node::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] < *threshold {
                    right.value(features)
                } else {
                    left.value(features)
                }
            }
        }
    }

    pub fn num_leaves(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Internal { left, right, .. } => left.num_leaves() + right.num_leaves(),
        }
    }

    fn write(
        &self,
        f: &mut fmt::Formatter<'_>,
        depth: usize,
        prefix: Option<&str>,
        labels: &[String],
    ) -> fmt::Result {
        match self {
            Node::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                let child_depth = match prefix {
                    Some(prefix) => {
                        indent(f, depth)?;
                        writeln!(f, "{prefix}")?;
                        depth + 1
                    }
                    // The root prints no line of its own.
                    None => depth,
                };
                let label = &labels[*feature];
                right.write(
                    f,
                    child_depth,
                    Some(&format!("{label} < {threshold}")),
                    labels,
                )?;
                left.write(
                    f,
                    child_depth,
                    Some(&format!("{label} >= {threshold}")),
                    labels,
                )
            }
            Node::Leaf(leaf) => {
                indent(f, depth)?;
                if let Some(prefix) = prefix {
                    f.write_str(prefix)?;
                }
                writeln!(f, " : {leaf}")
            }
        }
    }
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("|   ")?;
    }
    Ok(())
}

/// An immutable trained tree. Safe to share across threads for
/// concurrent prediction.
#[derive(Debug)]
pub struct RegressionTree<L> {
    root: Node<L>,
    num_features: usize,
    feature_labels: Vec<String>,
    target_label: String,
}

impl<L: FittedLeaf> RegressionTree<L> {
    pub(crate) fn new(
        root: Node<L>,
        num_features: usize,
        feature_labels: Vec<String>,
        target_label: String,
    ) -> Self {
        RegressionTree {
            root,
            num_features,
            feature_labels,
            target_label,
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn feature_labels(&self) -> &[String] {
        &self.feature_labels
    }

    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    pub fn num_leaves(&self) -> usize {
        self.root.num_leaves()
    }

    /// Predict the target for a single feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64, TreeError> {
        if features.len() != self.num_features {
            return Err(TreeError::ShapeMismatch(format!(
                "feature vector of length {}, expected {}",
                features.len(),
                self.num_features,
            )));
        }
        if let Some(i) = features.iter().position(|v| v.is_nan()) {
            return Err(TreeError::MissingValue(format!("feature {i}")));
        }
        Ok(self.root.value(features))
    }

    /// Predict every row of a view.
    pub fn predict_set(&self, set: &Instances, parallel: bool) -> Result<Vec<f64>, TreeError> {
        if parallel {
            (0..set.num_instances())
                .into_par_iter()
                .map(|i| self.predict(set.feature_row(i)?))
                .collect()
        } else {
            set.rows().map(|row| self.predict(row)).collect()
        }
    }
}

impl<L: FittedLeaf> fmt::Display for RegressionTree<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write(f, 0, None, &self.feature_labels)
    }
}
