// src/statistics.rs

//! Covariance and correlation matrices, plus descriptive feature statistics.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::ZERO_VARIANCE_THRESHOLD;
use crate::standardize::column_std_devs;

/// Covariance of already-centered data: `XᵀX / (n - 1)`.
///
/// The upper triangle is computed and mirrored so the result is exactly
/// symmetric.
pub fn covariance_matrix(centered: &ArrayView2<f64>) -> Array2<f64> {
    let n_samples = centered.nrows();
    let n_features = centered.ncols();
    let denom = (n_samples.max(2) - 1) as f64;

    let mut cov = Array2::<f64>::zeros((n_features, n_features));
    for i in 0..n_features {
        let col_i = centered.column(i);
        for j in i..n_features {
            let value = col_i.dot(&centered.column(j)) / denom;
            cov[[i, j]] = value;
            cov[[j, i]] = value;
        }
    }
    cov
}

/// Pearson correlation between the raw features.
///
/// Each feature is re-centered and re-scaled with its own mean and sample
/// standard deviation, independently of how the data is preprocessed for the
/// decomposition. The diagonal is fixed at exactly 1. A constant feature has
/// no linear relationship with anything and gets 0 off the diagonal. Values
/// are clamped to `[-1, 1]` to absorb rounding.
pub fn correlation_matrix(raw: &ArrayView2<f64>) -> Array2<f64> {
    let n_samples = raw.nrows();
    let n_features = raw.ncols();
    let mut corr = Array2::<f64>::eye(n_features);
    if n_samples < 2 {
        return corr;
    }

    let means = match raw.mean_axis(Axis(0)) {
        Some(m) => m,
        None => return corr,
    };
    let stds = column_std_devs(raw, &means);
    let denom = (n_samples - 1) as f64;

    let mut z = raw.to_owned();
    z -= &means;
    for (j, mut column) in z.axis_iter_mut(Axis(1)).enumerate() {
        if stds[j] > ZERO_VARIANCE_THRESHOLD {
            column /= stds[j];
        } else {
            column.fill(0.0);
        }
    }

    for i in 0..n_features {
        for j in (i + 1)..n_features {
            let r = (z.column(i).dot(&z.column(j)) / denom).clamp(-1.0, 1.0);
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }
    corr
}

/// Descriptive statistics of one feature column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub mean: f64,
    /// Upper median: the element at index `n / 2` of the sorted column.
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divisor `n`).
    pub std: f64,
}

/// Summaries of every column, in feature order.
pub fn feature_summaries(data: &ArrayView2<f64>) -> Vec<FeatureSummary> {
    data.axis_iter(Axis(1))
        .filter(|column| !column.is_empty())
        .map(|column| {
            let n = column.len() as f64;
            let mean = column.sum() / n;
            let mut sorted = column.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let variance = column.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
            FeatureSummary {
                mean,
                median: sorted[sorted.len() / 2],
                min: sorted[0],
                max: sorted[sorted.len() - 1],
                std: variance.sqrt(),
            }
        })
        .collect()
}

/// Number of samples carrying one class label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub label: usize,
    pub count: usize,
    /// `count / labels.len()`.
    pub fraction: f64,
}

/// Class balance of a label vector, sorted by label.
pub fn class_distribution(labels: &[usize]) -> Vec<ClassCount> {
    let mut counts = std::collections::BTreeMap::<usize, usize>::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let total = labels.len() as f64;
    counts
        .into_iter()
        .map(|(label, count)| ClassCount {
            label,
            count,
            fraction: count as f64 / total,
        })
        .collect()
}
