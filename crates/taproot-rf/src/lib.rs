//! Random forest classification with out-of-bag diagnostics.
//!
//! Forests are trained on row-major numeric matrices with integer
//! class labels via [`ForestConfig::fit`]. Training always produces
//! the OOB error curve, final OOB predictions, and a confusion matrix;
//! proximity accumulation is opt-in. [`MtrySearch`] sweeps the
//! per-split feature width around its default to confirm the choice.
//!
//! All randomness flows from the caller-supplied seed: per-tree seeds
//! are drawn up front from a master generator, so results do not
//! depend on thread scheduling.

mod config;
mod confusion;
mod error;
mod forest;
mod importance;
mod node;
mod oob;
mod proximity;
mod result;
mod split;
mod tree;
mod tune;

pub use config::{ForestConfig, MtryRule, ProximityMode};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::ForestError;
pub use forest::{Forest, train};
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use oob::{OobErrorPoint, OobTrace};
pub use proximity::ProximityMatrix;
pub use result::{TrainedModel, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::DecisionTree;
pub use tune::{MtrySearch, TuneResult, TuneTrial};
