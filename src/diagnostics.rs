// src/diagnostics.rs

//! Numerical health checks for an extracted eigen-basis.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Summary of how well a set of eigenpairs satisfies the solver's invariants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EigenDiagnostics {
    pub n_components: usize,
    /// ||I - VᵀV||_F over the eigenvector columns.
    pub orthogonality_error: Option<f64>,
    /// max_c | ||v_c|| - 1 |.
    pub max_unit_norm_deviation: Option<f64>,
    /// ||C v_c - λ_c v_c|| for each component.
    pub eigen_residuals: Vec<f64>,
    /// Largest residual divided by the leading eigenvalue (0 when it is 0).
    pub max_relative_residual: Option<f64>,
    /// Whether the eigenvalue sequence is non-increasing.
    pub eigenvalues_sorted: bool,
}

impl EigenDiagnostics {
    /// Checks every invariant against `tolerance`.
    pub fn within_tolerance(&self, tolerance: f64) -> bool {
        self.eigenvalues_sorted
            && self.orthogonality_error.map_or(true, |e| e <= tolerance)
            && self.max_unit_norm_deviation.map_or(true, |e| e <= tolerance)
    }
}

/// Computes Frobenius norm for an f64 matrix.
pub fn compute_frob_norm_f64(matrix: &ArrayView2<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Computes orthogonality error ||I - Q^T Q||_F for an f64 matrix.
pub fn compute_orthogonality_error_f64(q_matrix: &ArrayView2<f64>) -> Option<f64> {
    if q_matrix.nrows() == 0 || q_matrix.ncols() == 0 {
        return None;
    }
    let qtq = q_matrix.t().dot(q_matrix);
    let identity = Array2::<f64>::eye(qtq.nrows());
    let diff = identity - qtq;

    Some(compute_frob_norm_f64(&diff.view()))
}

/// Largest deviation of a column norm from 1.
pub fn max_unit_norm_deviation(vectors: &ArrayView2<f64>) -> Option<f64> {
    vectors
        .columns()
        .into_iter()
        .map(|c| (c.dot(&c).sqrt() - 1.0).abs())
        .reduce(f64::max)
}

/// ||C v - λ v|| for each column of `vectors`.
pub fn eigen_residuals(
    matrix: &ArrayView2<f64>,
    eigenvalues: &ArrayView1<f64>,
    vectors: &ArrayView2<f64>,
) -> Vec<f64> {
    vectors
        .columns()
        .into_iter()
        .zip(eigenvalues.iter())
        .map(|(v, &lambda)| {
            let residual = matrix.dot(&v) - &v * lambda;
            residual.dot(&residual).sqrt()
        })
        .collect()
}

/// Full diagnostics of `vectors`/`eigenvalues` as eigenpairs of `matrix`.
pub fn diagnose_eigenpairs(
    matrix: &ArrayView2<f64>,
    eigenvalues: &ArrayView1<f64>,
    vectors: &ArrayView2<f64>,
) -> EigenDiagnostics {
    let residuals = eigen_residuals(matrix, eigenvalues, vectors);
    let leading = eigenvalues.get(0).copied().unwrap_or(0.0);
    let max_relative_residual = residuals.iter().copied().reduce(f64::max).map(|r| {
        if leading > 0.0 {
            r / leading
        } else {
            0.0
        }
    });

    EigenDiagnostics {
        n_components: vectors.ncols(),
        orthogonality_error: compute_orthogonality_error_f64(vectors),
        max_unit_norm_deviation: max_unit_norm_deviation(vectors),
        eigen_residuals: residuals,
        max_relative_residual,
        eigenvalues_sorted: eigenvalues
            .iter()
            .zip(eigenvalues.iter().skip(1))
            .all(|(a, b)| a >= b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn identity_basis_is_perfect() {
        let m = array![[3.0, 0.0], [0.0, 1.0]];
        let values = array![3.0, 1.0];
        let vectors = Array2::<f64>::eye(2);
        let d = diagnose_eigenpairs(&m.view(), &values.view(), &vectors.view());
        assert_eq!(d.n_components, 2);
        assert_eq!(d.orthogonality_error, Some(0.0));
        assert_eq!(d.max_unit_norm_deviation, Some(0.0));
        assert_eq!(d.eigen_residuals, vec![0.0, 0.0]);
        assert!(d.eigenvalues_sorted);
        assert!(d.within_tolerance(1e-12));
    }

    #[test]
    fn detects_non_orthogonal_and_unsorted_input() {
        let m = array![[1.0, 0.0], [0.0, 1.0]];
        let values = array![1.0, 2.0];
        let vectors = array![[1.0, 1.0], [0.0, 0.0]];
        let d = diagnose_eigenpairs(&m.view(), &values.view(), &vectors.view());
        assert!(!d.eigenvalues_sorted);
        assert_abs_diff_eq!(d.orthogonality_error.unwrap(), 2.0f64.sqrt(), epsilon = 1e-12);
        // Second pair: C v - 2 v = -v, norm 1.
        assert_abs_diff_eq!(d.eigen_residuals[1], 1.0, epsilon = 1e-12);
        assert!(!d.within_tolerance(1e-3));
    }

    #[test]
    fn empty_basis_has_no_metrics() {
        let m = Array2::<f64>::eye(2);
        let values = ndarray::Array1::<f64>::zeros(0);
        let vectors = Array2::<f64>::zeros((2, 0));
        let d = diagnose_eigenpairs(&m.view(), &values.view(), &vectors.view());
        assert_eq!(d.orthogonality_error, None);
        assert_eq!(d.max_unit_norm_deviation, None);
        assert!(d.eigen_residuals.is_empty());
        assert!(d.eigenvalues_sorted);
    }
}
