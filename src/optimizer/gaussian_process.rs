//! Gaussian Process for Bayesian Optimization
//!
//! GP regression over the unit hypercube of a [`SearchSpace`], with an
//! acquisition function choosing the next configuration to try.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::search_space::{SearchSpace, TrialParams};
use super::{OptimizeDirection, Sampler};

/// Kernel function types for Gaussian Process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelType {
    /// Radial Basis Function (Squared Exponential)
    #[serde(rename = "rbf")]
    RBF { length_scale: f64 },
    /// Matern kernel with nu in {0.5, 1.5, 2.5}
    Matern { nu: f64, length_scale: f64 },
    /// Rational Quadratic kernel
    RationalQuadratic { length_scale: f64, alpha: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Matern { nu: 2.5, length_scale: 0.5 }
    }
}

fn compute_kernel(x1: &Array2<f64>, x2: &Array2<f64>, kernel: &KernelType) -> Array2<f64> {
    let mut k = Array2::zeros((x1.nrows(), x2.nrows()));
    for (i, xi) in x1.rows().into_iter().enumerate() {
        for (j, xj) in x2.rows().into_iter().enumerate() {
            k[[i, j]] = kernel_value(&xi, &xj, kernel);
        }
    }
    k
}

fn kernel_value(x1: &ArrayView1<f64>, x2: &ArrayView1<f64>, kernel: &KernelType) -> f64 {
    let diff = x1 - x2;
    let dist_sq = diff.dot(&diff);

    match *kernel {
        KernelType::RBF { length_scale } => {
            (-0.5 * dist_sq / (length_scale * length_scale)).exp()
        }
        KernelType::Matern { nu, length_scale } => {
            let r = dist_sq.sqrt() / length_scale;
            if r < 1e-10 {
                return 1.0;
            }
            if (nu - 0.5).abs() < 1e-6 {
                (-r).exp()
            } else if (nu - 1.5).abs() < 1e-6 {
                let sqrt3 = 3.0_f64.sqrt();
                (1.0 + sqrt3 * r) * (-sqrt3 * r).exp()
            } else {
                let sqrt5 = 5.0_f64.sqrt();
                (1.0 + sqrt5 * r + 5.0 / 3.0 * r * r) * (-sqrt5 * r).exp()
            }
        }
        KernelType::RationalQuadratic { length_scale, alpha } => {
            (1.0 + dist_sq / (2.0 * alpha * length_scale * length_scale)).powf(-alpha)
        }
    }
}

/// Acquisition function types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AcquisitionFunction {
    /// Expected Improvement
    EI,
    /// Probability of Improvement
    PI,
    /// Upper Confidence Bound
    UCB { kappa: f64 },
}

impl Default for AcquisitionFunction {
    fn default() -> Self {
        AcquisitionFunction::EI
    }
}

/// Gaussian Process model for regression
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: KernelType,
    noise: f64,
    x_train: Option<Array2<f64>>,
    /// Cholesky factor of K + noise*I
    l_chol: Option<Array2<f64>>,
    alpha: Option<Array1<f64>>,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    /// Create new GP with given kernel
    pub fn new(kernel: KernelType) -> Self {
        Self {
            kernel,
            noise: 1e-6,
            x_train: None,
            l_chol: None,
            alpha: None,
            y_mean: 0.0,
            y_std: 1.0,
        }
    }

    /// Set noise level
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(1e-10);
        self
    }

    /// Fit the GP to training data
    pub fn fit(&mut self, x: Array2<f64>, y: Array1<f64>) -> Result<()> {
        let n = y.len();
        if x.nrows() != n {
            return Err(PipelineError::Shape {
                expected: format!("{} rows", n),
                actual: format!("{} rows", x.nrows()),
            });
        }
        if n == 0 {
            return Err(PipelineError::InsufficientData { required: 1, actual: 0 });
        }

        self.y_mean = y.mean().unwrap_or(0.0);
        self.y_std = y.std(0.0);
        if self.y_std < 1e-10 {
            self.y_std = 1.0;
        }
        let y_normalized = y.mapv(|yi| (yi - self.y_mean) / self.y_std);

        let mut k = compute_kernel(&x, &x, &self.kernel);
        for i in 0..n {
            k[[i, i]] += self.noise;
        }

        let l = cholesky(&k);
        let alpha = solve_cholesky(&l, &y_normalized);

        self.x_train = Some(x);
        self.l_chol = Some(l);
        self.alpha = Some(alpha);
        Ok(())
    }

    /// Predict mean and variance at test points
    pub fn predict(&self, x_test: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let (Some(x_train), Some(l), Some(alpha)) = (&self.x_train, &self.l_chol, &self.alpha)
        else {
            return Err(PipelineError::ModelNotFitted);
        };

        let k_star = compute_kernel(x_test, x_train, &self.kernel);
        let mean = k_star.dot(alpha).mapv(|m| m * self.y_std + self.y_mean);

        let var: Array1<f64> = x_test
            .rows()
            .into_iter()
            .zip(k_star.rows())
            .map(|(xi, ki)| {
                let k_self = kernel_value(&xi, &xi, &self.kernel);
                let v = solve_lower_triangular(l, &ki.to_owned());
                (k_self - v.dot(&v)).max(1e-10) * self.y_std * self.y_std
            })
            .collect();

        Ok((mean, var))
    }
}

fn cholesky(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                l[[j, j]] = (a[[j, j]] - sum).max(1e-10).sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    l
}

/// Solve L @ x = b for lower triangular L
fn solve_lower_triangular(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * x[j]).sum();
        x[i] = (b[i] - sum) / l[[i, i]];
    }
    x
}

/// Solve L @ L^T @ x = b
fn solve_cholesky(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let y = solve_lower_triangular(l, b);

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Configuration for Bayesian Optimization (`bayes` in a sweep file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianOptConfig {
    pub kernel: KernelType,
    pub acquisition: AcquisitionFunction,
    /// Random trials before the GP takes over
    pub n_startup_trials: usize,
    /// Random candidates scored by the acquisition function per suggestion
    pub n_candidates: usize,
    /// Noise level for GP
    pub noise: f64,
}

impl Default for BayesianOptConfig {
    fn default() -> Self {
        Self {
            kernel: KernelType::default(),
            acquisition: AcquisitionFunction::EI,
            n_startup_trials: 2,
            n_candidates: 500,
            noise: 1e-6,
        }
    }
}

/// Gaussian Process based Bayesian Optimization sampler
#[derive(Debug)]
pub struct GPSampler {
    rng: Xoshiro256PlusPlus,
    config: BayesianOptConfig,
    direction: OptimizeDirection,
}

impl GPSampler {
    /// Create a new GP sampler
    pub fn new(config: BayesianOptConfig, direction: OptimizeDirection, seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            config,
            direction,
        }
    }

    fn acquisition_value(&self, mean: f64, var: f64, best_y: f64) -> f64 {
        let std = var.sqrt().max(1e-10);
        let improvement = match self.direction {
            OptimizeDirection::Minimize => best_y - mean,
            OptimizeDirection::Maximize => mean - best_y,
        };

        match self.config.acquisition {
            AcquisitionFunction::EI => {
                let z = improvement / std;
                improvement * normal_cdf(z) + std * normal_pdf(z)
            }
            AcquisitionFunction::PI => normal_cdf(improvement / std),
            AcquisitionFunction::UCB { kappa } => match self.direction {
                OptimizeDirection::Minimize => -(mean - kappa * std),
                OptimizeDirection::Maximize => mean + kappa * std,
            },
        }
    }
}

impl Sampler for GPSampler {
    fn sample(&mut self, space: &SearchSpace, history: &[(TrialParams, f64)]) -> Result<TrialParams> {
        if history.len() < self.config.n_startup_trials.max(1) {
            return Ok(space.sample(&mut self.rng));
        }

        let rows: Vec<Array1<f64>> = history.iter().map(|(p, _)| space.normalize(p)).collect();
        let views: Vec<ArrayView1<f64>> = rows.iter().map(|r| r.view()).collect();
        let x_train = ndarray::stack(Axis(0), &views)?;
        let y_train: Array1<f64> = history.iter().map(|(_, y)| *y).collect();

        let best_y = match self.direction {
            OptimizeDirection::Minimize => y_train.iter().copied().fold(f64::INFINITY, f64::min),
            OptimizeDirection::Maximize => y_train.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };

        let mut gp = GaussianProcess::new(self.config.kernel.clone()).with_noise(self.config.noise);
        gp.fit(x_train, y_train)?;

        let mut best: Option<(TrialParams, f64)> = None;
        for _ in 0..self.config.n_candidates.max(1) {
            let candidate = space.sample(&mut self.rng);
            if history.iter().any(|(p, _)| *p == candidate) {
                continue;
            }

            let x = space.normalize(&candidate).insert_axis(Axis(0));
            let (mean, var) = gp.predict(&x)?;
            let acq = self.acquisition_value(mean[0], var[0], best_y);

            if best.as_ref().map_or(true, |(_, a)| acq > *a) {
                best = Some((candidate, acq));
            }
        }

        // Every candidate was already tried; fall back to a random draw
        Ok(best.map_or_else(|| space.sample(&mut self.rng), |(p, _)| p))
    }
}

/// Standard normal CDF approximation
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal PDF
fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Error function approximation (Abramowitz and Stegun)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
