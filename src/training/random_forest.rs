//! Random forest classifier

use crate::error::{PipelineError, Result};
use super::decision_tree::{argmax_classes, sorted_classes, Criterion, DecisionTree};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Strategy for max features.
///
/// Written as `sqrt`, `log2`, `all`, a whole number of features, or a
/// fraction in `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f) as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::Sqrt => f.write_str("sqrt"),
            MaxFeatures::Log2 => f.write_str("log2"),
            MaxFeatures::Fraction(v) => write!(f, "{}", v),
            MaxFeatures::Fixed(n) => write!(f, "{}", n),
            MaxFeatures::All => f.write_str("all"),
        }
    }
}

impl FromStr for MaxFeatures {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            PipelineError::Configuration(format!(
                "invalid max_features '{}', expected sqrt, log2, all, a count or a fraction in (0, 1)",
                s
            ))
        };

        match s.trim().to_ascii_lowercase().as_str() {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" => Ok(MaxFeatures::All),
            other => {
                if let Ok(n) = other.parse::<usize>() {
                    return if n > 0 { Ok(MaxFeatures::Fixed(n)) } else { Err(invalid()) };
                }
                match other.parse::<f64>() {
                    Ok(f) if f > 0.0 && f < 1.0 => Ok(MaxFeatures::Fraction(f)),
                    _ => Err(invalid()),
                }
            }
        }
    }
}

impl TryFrom<String> for MaxFeatures {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MaxFeatures> for String {
    fn from(value: MaxFeatures) -> Self {
        value.to_string()
    }
}

/// Hyperparameters of a forest; [`fit`](Self::fit) consumes them and
/// returns the fitted [`RandomForest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for bootstrap and feature sampling
    pub random_state: u64,
    /// Worker threads used to grow trees
    pub n_jobs: usize,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestConfig {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 0,
            n_jobs: 1,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Set the number of worker threads
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs.max(1);
        self
    }

    /// Fit a forest on `x` and `y`.
    ///
    /// Per-tree seeds are drawn up front from `random_state`, so the fitted
    /// forest is the same whatever `n_jobs` is.
    pub fn fit(self, x: &Array2<f64>, y: &Array1<f64>) -> Result<RandomForest> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::InsufficientData { required: 1, actual: 0 });
        }
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let classes = sorted_classes(y);
        let max_features = self.max_features.resolve(n_features);

        let mut seeder = ChaCha8Rng::seed_from_u64(self.random_state);
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| seeder.next_u64()).collect();

        let grow = |seed: &u64| self.grow_tree(x, y, &classes, max_features, *seed);

        let trees: Vec<DecisionTree> = if self.n_jobs <= 1 {
            seeds.iter().map(grow).collect::<Result<_>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()
                .map_err(|e| PipelineError::Configuration(format!("thread pool: {}", e)))?;
            pool.install(|| seeds.par_iter().map(grow).collect::<Result<_>>())?
        };

        debug!(
            n_trees = trees.len(),
            n_samples,
            n_features,
            max_features,
            n_jobs = self.n_jobs,
            "fitted random forest"
        );

        let feature_importances = mean_importances(&trees, n_features);

        Ok(RandomForest {
            config: self,
            trees,
            classes,
            n_features,
            feature_importances,
        })
    }

    fn grow_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        classes: &[f64],
        max_features: usize,
        seed: u64,
    ) -> Result<DecisionTree> {
        let n_samples = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut tree = DecisionTree::new_classifier()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_criterion(self.criterion)
            .with_max_features(max_features)
            .with_random_state(rng.next_u64());
        if let Some(d) = self.max_depth {
            tree = tree.with_max_depth(d);
        }

        if self.bootstrap {
            let sample_indices: Vec<usize> =
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let x_boot = x.select(Axis(0), &sample_indices);
            let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();
            tree.fit_with_classes(&x_boot, &y_boot, classes.to_vec())?;
        } else {
            tree.fit_with_classes(x, y, classes.to_vec())?;
        }

        Ok(tree)
    }
}

/// A fitted random forest
///
/// Class probabilities are the mean of the per-tree leaf distributions;
/// the predicted class is the most probable one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: RandomForestConfig,
    trees: Vec<DecisionTree>,
    classes: Vec<f64>,
    n_features: usize,
    feature_importances: Array1<f64>,
}

impl RandomForest {
    /// Start configuring a forest of `n_estimators` trees
    pub fn builder(n_estimators: usize) -> RandomForestConfig {
        RandomForestConfig::new(n_estimators)
    }

    /// Predict class probabilities, one column per entry of [`classes`](Self::classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut proba = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for tree in &self.trees {
            proba += &tree.predict_proba(x)?;
        }
        proba /= self.trees.len().max(1) as f64;
        Ok(proba)
    }

    /// Probability of the positive class (label 1) for each row
    pub fn predict_positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        match self.classes.iter().position(|&c| c == 1.0) {
            Some(j) => Ok(proba.column(j).to_owned()),
            None => Ok(Array1::zeros(x.nrows())),
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_classes(&proba, &self.classes))
    }

    /// Write the forest to `path` with bincode, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        debug!(path = %path.display(), "saved model");
        Ok(())
    }

    /// Read a forest written by [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::Data(format!("cannot open model {}: {}", path.display(), e))
        })?;
        let model = bincode::deserialize_from(BufReader::new(file))?;
        Ok(model)
    }

    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    /// Sorted class labels seen at fit time
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &Array1<f64> {
        &self.feature_importances
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest tree in the forest
    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::get_depth).max().unwrap_or(0)
    }
}

fn mean_importances(trees: &[DecisionTree], n_features: usize) -> Array1<f64> {
    let mut total = Array1::<f64>::zeros(n_features);
    for imp in trees.iter().filter_map(DecisionTree::feature_importances) {
        total += imp;
    }

    let sum = total.sum();
    if sum > 0.0 {
        total /= sum;
    }
    total
}
