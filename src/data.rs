use std::collections::BTreeMap;
use std::sync::Arc;

use crate::criterion::SplitCriterion;
use crate::errors::TreeError;

/// Immutable view over a numeric training set: a row-major feature
/// store, an aligned target sequence, and labels.
///
/// The backing stores are shared between views. Splitting a view only
/// duplicates the row-index bookkeeping, never the feature or target
/// values, so repeated partitioning during tree induction stays cheap.
#[derive(Debug, Clone)]
pub struct Instances {
    features: Arc<[f64]>,
    targets: Arc<[f64]>,
    feature_labels: Arc<[String]>,
    target_label: Arc<str>,
    index: Vec<usize>,
    num_features: usize,
}

impl Instances {
    pub fn num_instances(&self) -> usize {
        self.index.len()
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

    /// Row `i` of this view as a feature slice.
    pub fn feature_row(&self, i: usize) -> Result<&[f64], TreeError> {
        match self.index.get(i) {
            Some(&stored) => Ok(self.stored_row(stored)),
            None => Err(TreeError::OutOfRange {
                index: i,
                len: self.index.len(),
            }),
        }
    }

    /// Iterate the visible rows in view order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.index.iter().map(|&stored| self.stored_row(stored))
    }

    fn stored_row(&self, stored: usize) -> &[f64] {
        let start = stored * self.num_features;
        &self.features[start..start + self.num_features]
    }

    /// Column `feature` of this view, aligned with row order.
    pub fn feature_column(&self, feature: usize) -> Vec<f64> {
        self.index
            .iter()
            .map(|&stored| self.features[stored * self.num_features + feature])
            .collect()
    }

    /// Distinct values present in a column, ascending.
    pub fn unique_values(&self, feature: usize) -> Vec<f64> {
        let mut values = self.feature_column(feature);
        values.sort_unstable_by(f64::total_cmp);
        values.dedup();
        values
    }

    /// Target values of this view, aligned with row order.
    pub fn target_values(&self) -> Vec<f64> {
        self.index.iter().map(|&stored| self.targets[stored]).collect()
    }

    /// Partition this view in a single stable pass. A row lands in the
    /// left result iff `criterion.is_left` holds for it; both results
    /// share the backing stores and labels of the parent.
    pub fn split(&self, criterion: &SplitCriterion) -> (Instances, Instances) {
        let mut left = Vec::with_capacity(self.index.len());
        let mut right = Vec::with_capacity(self.index.len());
        for &stored in &self.index {
            if criterion.is_left(self.stored_row(stored)) {
                left.push(stored);
            } else {
                right.push(stored);
            }
        }
        (self.with_index(left), self.with_index(right))
    }

    fn with_index(&self, index: Vec<usize>) -> Instances {
        Instances {
            features: Arc::clone(&self.features),
            targets: Arc::clone(&self.targets),
            feature_labels: Arc::clone(&self.feature_labels),
            target_label: Arc::clone(&self.target_label),
            index,
            num_features: self.num_features,
        }
    }

    pub fn builder() -> InstancesBuilder {
        InstancesBuilder::new()
    }
}

/// Collects rows one instance at a time and validates them on entry.
/// The first instance fixes the feature count.
#[derive(Debug, Default)]
pub struct InstancesBuilder {
    features: Vec<f64>,
    targets: Vec<f64>,
    feature_labels: BTreeMap<usize, String>,
    target_label: String,
    num_features: Option<usize>,
}

impl InstancesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instance(
        &mut self,
        target: f64,
        features: &[f64],
    ) -> Result<&mut Self, TreeError> {
        let instance = self.targets.len();
        if target.is_nan() {
            return Err(TreeError::MissingValue(format!(
                "target of instance {instance}"
            )));
        }
        if let Some(i) = features.iter().position(|v| v.is_nan()) {
            return Err(TreeError::MissingValue(format!(
                "feature {i} of instance {instance}"
            )));
        }
        match self.num_features {
            None => self.num_features = Some(features.len()),
            Some(expected) if expected != features.len() => {
                return Err(TreeError::ShapeMismatch(format!(
                    "instance {} has {} features, expected {}",
                    instance,
                    features.len(),
                    expected,
                )));
            }
            Some(_) => {}
        }
        self.features.extend_from_slice(features);
        self.targets.push(target);
        Ok(self)
    }

    pub fn set_feature_label(&mut self, label: &str, feature: usize) -> &mut Self {
        self.feature_labels.insert(feature, label.to_string());
        self
    }

    pub fn set_feature_labels<S: AsRef<str>>(&mut self, labels: &[S]) -> &mut Self {
        for (i, label) in labels.iter().enumerate() {
            self.set_feature_label(label.as_ref(), i);
        }
        self
    }

    pub fn set_target_label(&mut self, label: &str) -> &mut Self {
        self.target_label = label.to_string();
        self
    }

    /// Finish the view. Feature positions without a label default to
    /// the empty string.
    pub fn build(self) -> Instances {
        let num_features = self.num_features.unwrap_or_else(|| {
            self.feature_labels
                .keys()
                .next_back()
                .map_or(0, |last| last + 1)
        });
        let mut labels = vec![String::new(); num_features];
        for (i, label) in self.feature_labels {
            if i < num_features {
                labels[i] = label;
            }
        }
        let num_instances = self.targets.len();
        Instances {
            features: self.features.into(),
            targets: self.targets.into(),
            feature_labels: labels.into(),
            target_label: self.target_label.into(),
            index: (0..num_instances).collect(),
            num_features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Instances {
        let mut builder = Instances::builder();
        builder
            .add_instance(1.0, &[5.0, 10.0])
            .unwrap()
            .add_instance(2.0, &[1.0, 20.0])
            .unwrap()
            .add_instance(3.0, &[3.0, 10.0])
            .unwrap()
            .add_instance(4.0, &[2.0, 40.0])
            .unwrap();
        builder.set_feature_labels(&["a", "b"]).set_target_label("y");
        builder.build()
    }

    #[test]
    fn test_build() {
        let set = sample();
        assert_eq!(set.num_instances(), 4);
        assert_eq!(set.num_features(), 2);
        assert_eq!(set.feature_labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(set.target_label(), "y");
        assert_eq!(set.feature_row(1).unwrap(), &[1.0, 20.0]);
        assert_eq!(set.target_values(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_row_out_of_range() {
        let set = sample();
        let err = set.feature_row(4).unwrap_err();
        assert!(matches!(err, TreeError::OutOfRange { index: 4, len: 4 }));
    }

    #[test]
    fn test_builder_shape_mismatch() {
        let mut builder = Instances::builder();
        builder.add_instance(1.0, &[1.0, 2.0]).unwrap();
        let err = builder.add_instance(2.0, &[1.0]).unwrap_err();
        assert!(matches!(err, TreeError::ShapeMismatch(_)));
    }

    #[test]
    fn test_builder_missing_value() {
        let mut builder = Instances::builder();
        let err = builder.add_instance(1.0, &[1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, TreeError::MissingValue(_)));
        let err = builder.add_instance(f64::NAN, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, TreeError::MissingValue(_)));
    }

    #[test]
    fn test_unlabeled_features_default_to_empty() {
        let mut builder = Instances::builder();
        builder.add_instance(1.0, &[1.0, 2.0, 3.0]).unwrap();
        builder.set_feature_label("middle", 1);
        let set = builder.build();
        assert_eq!(
            set.feature_labels(),
            &[String::new(), "middle".to_string(), String::new()]
        );
    }

    #[test]
    fn test_column_and_unique_values() {
        let set = sample();
        assert_eq!(set.feature_column(1), vec![10.0, 20.0, 10.0, 40.0]);
        assert_eq!(set.unique_values(1), vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn test_split_is_lossless_and_stable() {
        let set = sample();
        let (left, right) = set.split(&SplitCriterion::new(0, 3.0));
        assert_eq!(left.num_instances() + right.num_instances(), 4);
        // Boundary row (a == 3.0) goes left; order within each side
        // follows the parent.
        assert_eq!(left.feature_row(0).unwrap(), &[5.0, 10.0]);
        assert_eq!(left.feature_row(1).unwrap(), &[3.0, 10.0]);
        assert_eq!(left.target_values(), vec![1.0, 3.0]);
        assert_eq!(right.feature_row(0).unwrap(), &[1.0, 20.0]);
        assert_eq!(right.feature_row(1).unwrap(), &[2.0, 40.0]);
        assert_eq!(right.target_values(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_split_shares_backing_store() {
        let set = sample();
        let (left, right) = set.split(&SplitCriterion::new(1, 20.0));
        assert!(Arc::ptr_eq(&set.features, &left.features));
        assert!(Arc::ptr_eq(&set.features, &right.features));
        assert!(Arc::ptr_eq(&set.targets, &right.targets));
        assert_eq!(left.num_features(), 2);
        assert_eq!(left.target_label(), "y");
    }

    #[test]
    fn test_split_empty_side() {
        let set = sample();
        let (left, right) = set.split(&SplitCriterion::new(0, 0.0));
        assert_eq!(left.num_instances(), 4);
        assert_eq!(right.num_instances(), 0);
        assert!(right.target_values().is_empty());
    }
}
