use std::cmp::Ordering;

use log::{debug, trace};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::criterion::SplitCriterion;
use crate::data::Instances;
use crate::errors::TreeError;
use crate::leaf::{ConstantModel, LeafModel, LinearModel};
use crate::tree::{Node, RegressionTree};

/// Nodes smaller than this are grown inline, bounding task fan-out on
/// deep or wide trees.
const PARALLEL_MIN_ROWS: usize = 256;

/// Grows a regression tree by exhaustive best-split search: every
/// distinct value of every feature is a candidate threshold, scored by
/// the summed leaf-model error of the two sides it produces.
///
/// The leaf model decides the tree variant; use the
/// [`RegressionTreeTrainer`] and [`ModelTreeTrainer`] aliases for the
/// constant-leaf and linear-leaf trees.
pub struct Trainer<M: LeafModel> {
    leaf_model: M,
    min_error_delta: f64,
    min_rows_per_child: usize,
    num_threads: usize,
    training_set: Option<Instances>,
}

/// Constant-leaf (CART style) regression tree trainer.
pub type RegressionTreeTrainer = Trainer<ConstantModel>;

/// Linear-leaf model tree trainer.
pub type ModelTreeTrainer = Trainer<LinearModel>;

impl Default for RegressionTreeTrainer {
    fn default() -> Self {
        Trainer::new(ConstantModel)
    }
}

impl Default for ModelTreeTrainer {
    fn default() -> Self {
        Trainer::new(LinearModel)
    }
}

impl<M: LeafModel> Trainer<M> {
    pub fn new(leaf_model: M) -> Self {
        Trainer {
            leaf_model,
            min_error_delta: 0.001,
            min_rows_per_child: 3,
            num_threads: 0,
            training_set: None,
        }
    }

    /// Minimum error improvement a split must deliver over its parent.
    pub fn set_min_error_delta(mut self, min_error_delta: f64) -> Self {
        self.min_error_delta = min_error_delta;
        self
    }

    /// Minimum rows each side of a split must retain.
    pub fn set_min_rows_per_child(mut self, min_rows_per_child: usize) -> Self {
        self.min_rows_per_child = min_rows_per_child;
        self
    }

    /// Threading contract:
    /// - `0`: run on the current rayon pool
    /// - `1`: run strictly sequential
    /// - `n > 1`: build a dedicated pool for the training call
    pub fn set_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn set_training_set(mut self, set: Instances) -> Self {
        self.training_set = Some(set);
        self
    }

    fn validate(&self) -> Result<&Instances, TreeError> {
        if self.min_rows_per_child < 1 {
            return Err(TreeError::InvalidConfiguration(
                "min_rows_per_child must be at least 1".to_string(),
            ));
        }
        self.training_set.as_ref().ok_or_else(|| {
            TreeError::InvalidConfiguration("missing training set".to_string())
        })
    }

    /// Induce a tree over the configured training set.
    pub fn train(&self) -> Result<RegressionTree<M::Fitted>, TreeError> {
        let set = self.validate()?;
        debug!(
            "training on {} instances with {} features ({} threads requested)",
            set.num_instances(),
            set.num_features(),
            self.num_threads,
        );
        let root = match self.num_threads {
            1 => self.grow(set, false),
            0 => self.grow(set, true),
            n => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| {
                        TreeError::InvalidConfiguration(format!(
                            "could not build a {n} thread pool: {e}"
                        ))
                    })?;
                pool.install(|| self.grow(set, true))
            }
        }?;
        debug!("induced a tree with {} leaves", root.num_leaves());
        Ok(RegressionTree::new(
            root,
            set.num_features(),
            set.feature_labels().to_vec(),
            set.target_label().to_string(),
        ))
    }

    fn grow(&self, set: &Instances, parallel: bool) -> Result<Node<M::Fitted>, TreeError> {
        let parallel_node = parallel && set.num_instances() >= PARALLEL_MIN_ROWS;
        let criterion = match self.choose_best_split(set, parallel_node)? {
            Some(criterion) => criterion,
            None => return Ok(Node::Leaf(self.leaf_model.fit_leaf(set)?)),
        };

        let (left_set, right_set) = set.split(&criterion);
        trace!(
            "split feature {} at {} into {} | {} rows",
            criterion.feature,
            criterion.threshold,
            left_set.num_instances(),
            right_set.num_instances(),
        );
        let (left, right) = if parallel_node {
            rayon::join(
                || self.grow(&left_set, parallel),
                || self.grow(&right_set, parallel),
            )
        } else {
            (self.grow(&left_set, parallel), self.grow(&right_set, parallel))
        };
        Ok(Node::Internal {
            feature: criterion.feature,
            threshold: criterion.threshold,
            left: Box::new(left?),
            right: Box::new(right?),
        })
    }

    /// Exhaustive candidate search. Returns `None` when the set should
    /// become a leaf: homogeneous targets, no candidate leaving
    /// `min_rows_per_child` rows on both sides, or best improvement
    /// below `min_error_delta`.
    fn choose_best_split(
        &self,
        set: &Instances,
        parallel: bool,
    ) -> Result<Option<SplitCriterion>, TreeError> {
        if has_single_value(&set.target_values()) {
            return Ok(None);
        }

        let parent_error = self.leaf_model.error(set)?;
        let candidates: Vec<SplitCriterion> = (0..set.num_features())
            .flat_map(|feature| {
                set.unique_values(feature)
                    .into_iter()
                    .map(move |threshold| SplitCriterion::new(feature, threshold))
            })
            .collect();

        let scored: Vec<Option<SplitCandidate>> = if parallel {
            candidates
                .par_iter()
                .map(|criterion| self.evaluate_candidate(set, criterion))
                .collect::<Result<_, _>>()?
        } else {
            candidates
                .iter()
                .map(|criterion| self.evaluate_candidate(set, criterion))
                .collect::<Result<_, _>>()?
        };

        let best = scored
            .into_iter()
            .flatten()
            .fold(None::<SplitCandidate>, |best, candidate| match best {
                Some(best) if !candidate.beats(&best) => Some(best),
                _ => Some(candidate),
            });

        match best {
            Some(best) if parent_error - best.error >= self.min_error_delta => Ok(Some(
                SplitCriterion::new(best.feature, best.threshold),
            )),
            _ => Ok(None),
        }
    }

    /// Score one candidate, or discard it when a side falls below the
    /// row floor or its error is NaN.
    fn evaluate_candidate(
        &self,
        set: &Instances,
        criterion: &SplitCriterion,
    ) -> Result<Option<SplitCandidate>, TreeError> {
        let (left, right) = set.split(criterion);
        if left.num_instances() < self.min_rows_per_child
            || right.num_instances() < self.min_rows_per_child
        {
            return Ok(None);
        }
        let error = self.leaf_model.error(&left)? + self.leaf_model.error(&right)?;
        if error.is_nan() {
            return Ok(None);
        }
        Ok(Some(SplitCandidate {
            feature: criterion.feature,
            threshold: criterion.threshold,
            error,
        }))
    }
}

/// Transient record produced during split search.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    error: f64,
}

impl SplitCandidate {
    /// Ordering used to select the winning candidate. Equal errors are
    /// broken by the smaller (feature, threshold) pair, so the winner
    /// matches the first candidate encountered in ascending enumeration
    /// order no matter how the evaluations were scheduled.
    fn beats(&self, other: &SplitCandidate) -> bool {
        match self.error.partial_cmp(&other.error) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => {
                self.feature < other.feature
                    || (self.feature == other.feature && self.threshold < other.threshold)
            }
            _ => false,
        }
    }
}

fn has_single_value(values: &[f64]) -> bool {
    match values.split_first() {
        Some((first, rest)) => rest.iter().all(|v| v.to_bits() == first.to_bits()),
        None => false,
    }
}
