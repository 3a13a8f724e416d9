//! Hyperparameter search
//!
//! Samplers proposing the next configuration of a sweep:
//! - Bayesian optimization with Gaussian Processes
//! - Random search

mod search_space;
pub mod gaussian_process;

pub use search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
pub use gaussian_process::{
    AcquisitionFunction, BayesianOptConfig, GPSampler, GaussianProcess, KernelType,
};

use crate::error::Result;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeDirection {
    Minimize,
    Maximize,
}

impl OptimizeDirection {
    /// Whether `candidate` beats `incumbent`
    pub fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            OptimizeDirection::Minimize => candidate < incumbent,
            OptimizeDirection::Maximize => candidate > incumbent,
        }
    }
}

/// Proposes configurations given the trials observed so far
pub trait Sampler: Send {
    fn sample(&mut self, space: &SearchSpace, history: &[(TrialParams, f64)]) -> Result<TrialParams>;
}

/// Uniform random search
#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, space: &SearchSpace, _history: &[(TrialParams, f64)]) -> Result<TrialParams> {
        Ok(space.sample(&mut self.rng))
    }
}
