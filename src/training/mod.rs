//! Model training
//!
//! The back half of the training pipeline:
//! - Train/test split of the prepared table
//! - Random forest classifier built from decision trees
//! - Train stage (fit and persist) and evaluate stage (accuracy, ROC-AUC)

mod engine;
mod metrics;
mod split;
pub mod decision_tree;
pub mod random_forest;

pub use engine::{evaluate_model, train_model, TrainingOptions, MODEL_SEED};
pub use metrics::{accuracy_score, roc_auc_score, EvaluationMetrics};
pub use split::{split_data, split_dataset, Dataset, SplitData, SPLIT_SEED, TEST_SIZE};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest, RandomForestConfig};
