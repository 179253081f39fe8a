// src/report.rs

//! Projection and the variance statistics derived from extracted eigenpairs.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{PcaError, Result};

/// Scores of every sample on every component: `X · V`, shape (n, k).
pub fn project(standardized: &ArrayView2<f64>, eigenvectors: &ArrayView2<f64>) -> Result<Array2<f64>> {
    if standardized.ncols() != eigenvectors.nrows() {
        return Err(PcaError::DimensionMismatch {
            expected: eigenvectors.nrows(),
            found: standardized.ncols(),
            context: "features of the data to project".to_string(),
        });
    }
    Ok(standardized.dot(eigenvectors))
}

/// Each eigenvalue as a fraction of the sum of the extracted eigenvalues.
///
/// The denominator covers only the extracted components, so the ratios sum to
/// 1 regardless of how much of the full spectrum those components capture.
///
/// # Errors
/// Returns [`PcaError::DegenerateInput`] when the extracted eigenvalues carry
/// no variance at all.
pub fn explained_variance_ratio(eigenvalues: &ArrayView1<f64>) -> Result<Array1<f64>> {
    let total = eigenvalues.sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(PcaError::DegenerateInput {
            message: format!(
                "extracted components explain no variance (eigenvalue sum {})",
                total
            ),
        });
    }
    Ok(eigenvalues.mapv(|v| v / total))
}

/// Running sum of the ratios.
pub fn cumulative_variance(ratios: &ArrayView1<f64>) -> Array1<f64> {
    let mut running = 0.0;
    ratios
        .iter()
        .map(|&r| {
            running += r;
            running
        })
        .collect()
}

/// Fraction of the extracted variance left out when keeping only the first
/// `m` components, for `m = 1..=k`. The last entry is 0.
pub fn reconstruction_error(eigenvalues: &ArrayView1<f64>) -> Array1<f64> {
    let total = eigenvalues.sum();
    let k = eigenvalues.len();
    let mut errors = Array1::<f64>::zeros(k);
    if total <= 0.0 {
        return errors;
    }
    let mut remaining = total;
    for (m, &value) in eigenvalues.iter().enumerate() {
        remaining -= value;
        errors[m] = (remaining / total).max(0.0);
    }
    if k > 0 {
        errors[k - 1] = 0.0;
    }
    errors
}

/// Eigenvector entries scaled by `sqrt(eigenvalue)`, feature-major (p, k).
pub fn loadings(eigenvectors: &ArrayView2<f64>, eigenvalues: &ArrayView1<f64>) -> Array2<f64> {
    let mut loadings = eigenvectors.to_owned();
    for (mut column, &value) in loadings.axis_iter_mut(Axis(1)).zip(eigenvalues.iter()) {
        column *= value.max(0.0).sqrt();
    }
    loadings
}

/// Smallest 1-based number of components whose cumulative variance reaches
/// `threshold`, or 0 if the threshold is never reached.
pub fn optimal_components(cumulative_variance: &[f64], threshold: f64) -> usize {
    cumulative_variance
        .iter()
        .position(|&v| v >= threshold)
        .map_or(0, |i| i + 1)
}
