//! Hyperparameter sweeps
//!
//! A sweep repeatedly starts a run with sampled hyperparameters, hands it to
//! a trial function (the train+evaluate cycle), and feeds the logged target
//! metric back to the sampler.

use crate::error::{PipelineError, Result};
use crate::optimizer::{
    BayesianOptConfig, GPSampler, OptimizeDirection, ParameterValue, RandomSampler, Sampler,
    SearchSpace, TrialParams,
};
use super::tracker::{ExperimentTracker, RunStatus};
use super::{RunConfig, RunContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Number of trials a sweep runs by default
pub const DEFAULT_SWEEP_COUNT: usize = 4;

/// Search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMethod {
    /// Gaussian-process Bayesian optimization
    Bayes,
    /// Uniform random search
    Random,
}

/// Target metric of a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepMetric {
    pub name: String,
    pub goal: OptimizeDirection,
}

/// Inclusive range of one swept parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterRange {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

/// Sweep definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub method: SweepMethod,
    pub name: String,
    pub metric: SweepMetric,
    pub parameters: BTreeMap<String, ParameterRange>,
    /// Kernel, acquisition function and budget of the `bayes` method
    #[serde(default)]
    pub bayes: BayesianOptConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            method: SweepMethod::Bayes,
            name: "sweep".to_string(),
            metric: SweepMetric {
                name: "roc_auc".to_string(),
                goal: OptimizeDirection::Maximize,
            },
            parameters: BTreeMap::from([
                ("n_estimators".to_string(), ParameterRange::Int { min: 25, max: 200 }),
                ("max_depth".to_string(), ParameterRange::Int { min: 3, max: 10 }),
            ]),
            bayes: BayesianOptConfig::default(),
        }
    }
}

impl SweepConfig {
    /// Search space over the swept parameters, in name order
    pub fn search_space(&self) -> Result<SearchSpace> {
        if self.parameters.is_empty() {
            return Err(PipelineError::Configuration(
                "sweep defines no parameters".to_string(),
            ));
        }

        let space = self
            .parameters
            .iter()
            .fold(SearchSpace::new(), |space, (name, range)| match *range {
                ParameterRange::Int { min, max } => space.int(name.as_str(), min, max),
                ParameterRange::Float { min, max } => space.float(name.as_str(), min, max),
            });
        space.validate()?;
        Ok(space)
    }
}

/// Outcome of one sweep trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTrial {
    pub run_id: String,
    pub run_name: String,
    pub params: TrialParams,
    /// Target metric, absent for failed trials
    pub value: Option<f64>,
    pub status: RunStatus,
}

/// Result of a whole sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub sweep_name: String,
    pub metric: SweepMetric,
    pub trials: Vec<SweepTrial>,
}

impl SweepSummary {
    /// Finished trial with the best target value
    pub fn best(&self) -> Option<&SweepTrial> {
        let goal = self.metric.goal;
        self.trials
            .iter()
            .filter_map(|t| t.value.map(|v| (v, t)))
            .fold(None, |best: Option<(f64, &SweepTrial)>, (v, t)| match best {
                Some((bv, _)) if !goal.is_better(v, bv) => best,
                _ => Some((v, t)),
            })
            .map(|(_, t)| t)
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| t.status == RunStatus::Failed).count()
    }
}

/// Drives the trials of a sweep
pub struct Sweep<'a> {
    config: SweepConfig,
    tracker: &'a ExperimentTracker,
    seed: u64,
}

impl<'a> Sweep<'a> {
    pub fn new(config: SweepConfig, tracker: &'a ExperimentTracker) -> Self {
        Self {
            config,
            tracker,
            seed: 42,
        }
    }

    /// Seed of the parameter sampler
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run `count` trials.
    ///
    /// Each trial gets a fresh run configured with the sampled parameters.
    /// A trial that errors, or finishes without logging the target metric,
    /// is recorded as failed and the sweep moves on.
    pub fn run<F>(&self, count: usize, mut trial: F) -> Result<SweepSummary>
    where
        F: FnMut(&mut dyn RunContext) -> Result<()>,
    {
        let space = self.config.search_space()?;
        let metric = &self.config.metric;
        let mut sampler: Box<dyn Sampler> = match self.config.method {
            SweepMethod::Bayes => Box::new(GPSampler::new(
                self.config.bayes.clone(),
                metric.goal,
                self.seed,
            )),
            SweepMethod::Random => Box::new(RandomSampler::new(self.seed)),
        };

        let mut history: Vec<(TrialParams, f64)> = Vec::new();
        let mut trials = Vec::with_capacity(count);

        for i in 0..count {
            let params = sampler.sample(&space, &history)?;
            let run_config: RunConfig = params
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect();

            let run_name = format!("{}-{}", self.config.name, i + 1);
            let mut run = self.tracker.init_named(run_name.clone(), run_config)?;
            let run_id = run.id().to_string();
            info!(sweep = %self.config.name, trial = i + 1, count, params = %format_params(&params), "starting sweep trial");

            let outcome = trial(&mut run).and_then(|()| {
                run.latest_metric(&metric.name).ok_or_else(|| {
                    PipelineError::Tracking(format!("trial did not log '{}'", metric.name))
                })
            });

            let (value, status) = match outcome {
                Ok(value) => {
                    run.finish()?;
                    history.push((params.clone(), value));
                    (Some(value), RunStatus::Finished)
                }
                Err(e) => {
                    warn!(sweep = %self.config.name, trial = i + 1, error = %e, "sweep trial failed");
                    run.fail(e.to_string())?;
                    (None, RunStatus::Failed)
                }
            };

            trials.push(SweepTrial {
                run_id,
                run_name,
                params,
                value,
                status,
            });
        }

        let summary = SweepSummary {
            sweep_name: self.config.name.clone(),
            metric: metric.clone(),
            trials,
        };
        if let Some(best) = summary.best() {
            info!(
                sweep = %summary.sweep_name,
                metric = %metric.name,
                value = best.value.unwrap_or_default(),
                params = %format_params(&best.params),
                "sweep finished"
            );
        }
        Ok(summary)
    }
}

/// `name=value` pairs joined by spaces
pub fn format_params(params: &TrialParams) -> String {
    params
        .iter()
        .map(|(name, value)| match value {
            ParameterValue::Int(v) => format!("{}={}", name, v),
            ParameterValue::Float(v) => format!("{}={:.4}", name, v),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
