//! Evaluation metrics for binary classifiers

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics reported for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Share of exact label matches
    pub accuracy: f64,
    /// Area under the ROC curve of the positive-class probability
    pub roc_auc: f64,
}

impl EvaluationMetrics {
    /// Compute both metrics from labels, predictions and positive-class scores
    pub fn compute(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_score: &Array1<f64>,
    ) -> Result<Self> {
        Ok(Self {
            accuracy: accuracy_score(y_true, y_pred)?,
            roc_auc: roc_auc_score(y_true, y_score)?,
        })
    }

    /// Metric name -> value, as sent to a run context
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("accuracy".to_string(), self.accuracy),
            ("roc_auc".to_string(), self.roc_auc),
        ])
    }

    /// Look a metric up by name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "accuracy" => Some(self.accuracy),
            "roc_auc" => Some(self.roc_auc),
            _ => None,
        }
    }
}

/// Fraction of predictions equal to the true label
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(PipelineError::Evaluation("no samples to score".to_string()));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// ROC-AUC of `y_score` against binary `y_true`.
///
/// Computed as the normalized Mann-Whitney U statistic; tied scores get
/// their average rank. Labels above 0.5 count as positive.
pub fn roc_auc_score(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_score)?;

    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(PipelineError::Evaluation(
            "ROC AUC is undefined when only one class is present in y_true".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // 1-based ranks, averaged over runs of equal scores
    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let avg_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|&(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let u = pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg as f64))
}

fn check_lengths(a: &Array1<f64>, b: &Array1<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(PipelineError::Shape {
            expected: format!("length {}", a.len()),
            actual: format!("length {}", b.len()),
        });
    }
    Ok(())
}
