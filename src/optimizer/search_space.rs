//! Search space definition for hyperparameters

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter
    Float { low: f64, high: f64 },
    /// Integer parameter, both bounds inclusive
    Int { low: i64, high: i64 },
}

/// A single hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float { low, high },
        }
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high },
        }
    }

    /// Reject empty or inverted ranges
    pub fn validate(&self) -> Result<()> {
        let ok = match self.param_type {
            ParameterType::Float { low, high } => low.is_finite() && high.is_finite() && low <= high,
            ParameterType::Int { low, high } => low <= high,
        };
        if ok {
            Ok(())
        } else {
            Err(PipelineError::InvalidParameter {
                name: self.name.clone(),
                value: format!("{:?}", self.param_type),
                reason: "lower bound must not exceed upper bound".to_string(),
            })
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match self.param_type {
            ParameterType::Float { low, high } => {
                ParameterValue::Float(rng.gen::<f64>() * (high - low) + low)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(low..=high)),
        }
    }

    /// Position of `value` within the range, in [0, 1]
    pub fn normalize(&self, value: &ParameterValue) -> f64 {
        let (low, high) = self.bounds();
        let span = high - low;
        if span <= 0.0 {
            return 0.5;
        }
        ((value.as_float() - low) / span).clamp(0.0, 1.0)
    }

    /// Bounds as floats
    pub fn bounds(&self) -> (f64, f64) {
        match self.param_type {
            ParameterType::Float { low, high } => (low, high),
            ParameterType::Int { low, high } => (low as f64, high as f64),
        }
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> f64 {
        match *self {
            ParameterValue::Float(v) => v,
            ParameterValue::Int(v) => v as f64,
        }
    }

    /// Get as int, rounding floats
    pub fn as_int(&self) -> i64 {
        match *self {
            ParameterValue::Int(v) => v,
            ParameterValue::Float(v) => v.round() as i64,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            ParameterValue::Int(v) => serde_json::Value::from(v),
            ParameterValue::Float(v) => serde_json::Value::from(v),
        }
    }
}

/// Alias for sampled configuration
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add a float parameter
    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    /// Add an integer parameter
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Check every parameter range
    pub fn validate(&self) -> Result<()> {
        self.parameters.iter().try_for_each(Parameter::validate)
    }

    /// Sample a random configuration
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }

    /// Map a configuration onto the unit hypercube, in parameter order.
    /// Missing parameters sit at the centre.
    pub fn normalize(&self, params: &TrialParams) -> Array1<f64> {
        self.parameters
            .iter()
            .map(|p| params.get(&p.name).map_or(0.5, |v| p.normalize(v)))
            .collect()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Get parameter names in order
    pub fn param_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }
}
