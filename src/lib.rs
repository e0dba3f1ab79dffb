pub mod criterion;
pub mod data;
pub mod errors;
pub mod leaf;
pub mod trainer;
pub mod tree;
pub mod utils;

pub use criterion::SplitCriterion;
pub use data::{Instances, InstancesBuilder};
pub use errors::TreeError;
pub use leaf::{ConstantLeaf, ConstantModel, FittedLeaf, LeafModel, LinearLeaf, LinearModel};
pub use trainer::{ModelTreeTrainer, RegressionTreeTrainer, Trainer};
pub use tree::{Node, RegressionTree};
