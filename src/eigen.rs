// src/eigen.rs

//! Top-k eigenpairs of a symmetric positive semi-definite matrix by power
//! iteration with deflation.
//!
//! Each component is found independently: a starting vector is repeatedly
//! multiplied by the matrix, and after every multiplication the directions of
//! all previously extracted eigenvectors are projected out. The deflated
//! vector therefore converges to the dominant eigenvector of the remaining
//! subspace, and the norm of the deflated product converges to its
//! eigenvalue.
//!
//! Only the top few components are ever needed, so a full decomposition is not
//! computed. Eigenvector signs are arbitrary; with random initialization they
//! can differ between runs.

use log::{debug, trace, warn};
use ndarray::{Array1, Array2, ArrayView2};
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Uniform;

use crate::config::{Initialization, PcaConfig, DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS};
use crate::error::{PcaError, Result};

/// Number of random draws tried before falling back to basis vectors when a
/// replacement direction is needed.
const RANDOM_FALLBACK_ATTEMPTS: usize = 8;

/// A candidate direction shorter than this after orthogonalization is
/// considered to lie in the span of the extracted eigenvectors.
const SPAN_THRESHOLD: f64 = 1e-8;

/// Knobs of the power iteration, extracted from a [`PcaConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    pub max_iterations: usize,
    pub tolerance: Option<f64>,
    pub epsilon: f64,
    pub initialization: Initialization,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: None,
            epsilon: DEFAULT_EPSILON,
            initialization: Initialization::default(),
        }
    }
}

impl From<&PcaConfig> for SolverSettings {
    fn from(config: &PcaConfig) -> Self {
        SolverSettings {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            epsilon: config.epsilon,
            initialization: config.initialization,
        }
    }
}

/// Extracted eigenpairs, ordered by descending eigenvalue.
#[derive(Clone, Debug)]
pub struct EigenPairs {
    /// Eigenvalue estimates, non-negative and non-increasing.
    pub eigenvalues: Array1<f64>,
    /// Unit eigenvectors as columns, shape (p, k).
    pub eigenvectors: Array2<f64>,
    /// `true` for components extracted after the matrix's directions were
    /// exhausted. Their eigenvalue is 0 and their vector is an arbitrary unit
    /// direction orthogonal to the others.
    pub degenerate: Vec<bool>,
    /// Power-iteration steps actually run for each component.
    pub iterations: Vec<usize>,
}

impl EigenPairs {
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }
}

/// Projects `basis` directions out of `v`. Run twice by callers that need the
/// result to be orthogonal to working precision.
fn deflate(v: &mut Array1<f64>, basis: &[Array1<f64>]) {
    for u in basis {
        let overlap = v.dot(u);
        v.scaled_add(-overlap, u);
    }
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Orthogonalizes `candidate` against `basis` and normalizes it, or returns
/// `None` if it lies (numerically) in their span.
fn orthonormal_candidate(mut candidate: Array1<f64>, basis: &[Array1<f64>]) -> Option<Array1<f64>> {
    deflate(&mut candidate, basis);
    deflate(&mut candidate, basis);
    let n = norm(&candidate);
    if n > SPAN_THRESHOLD {
        candidate /= n;
        Some(candidate)
    } else {
        None
    }
}

/// A unit vector orthogonal to every vector in `basis`.
///
/// Random draws are tried first when the initialization is random; standard
/// basis vectors are the deterministic fallback and always succeed while
/// `basis.len() < dim`.
fn orthogonal_direction(
    dim: usize,
    basis: &[Array1<f64>],
    initialization: Initialization,
    rng: &mut ChaCha8Rng,
) -> Option<Array1<f64>> {
    if let Initialization::Random { .. } = initialization {
        for _ in 0..RANDOM_FALLBACK_ATTEMPTS {
            let draw = Array1::random_using(dim, Uniform::new(-1.0, 1.0), rng);
            if let Some(v) = orthonormal_candidate(draw, basis) {
                return Some(v);
            }
        }
    }
    (0..dim).find_map(|axis| {
        let mut e = Array1::<f64>::zeros(dim);
        e[axis] = 1.0;
        orthonormal_candidate(e, basis)
    })
}

fn starting_vector(
    dim: usize,
    basis: &[Array1<f64>],
    initialization: Initialization,
    rng: &mut ChaCha8Rng,
) -> Option<Array1<f64>> {
    let candidate = match initialization {
        Initialization::Random { .. } => {
            let draw = Array1::random_using(dim, Uniform::new(0.0, 1.0), rng);
            let n = norm(&draw);
            if n > SPAN_THRESHOLD {
                return Some(draw / n);
            }
            None
        }
        Initialization::OrthogonalizedOnes => orthonormal_candidate(Array1::ones(dim), basis),
    };
    candidate.or_else(|| orthogonal_direction(dim, basis, initialization, rng))
}

fn make_rng(initialization: Initialization) -> ChaCha8Rng {
    match initialization {
        Initialization::Random { seed: Some(seed) } => ChaCha8Rng::seed_from_u64(seed),
        Initialization::Random { seed: None } => ChaCha8Rng::from_entropy(),
        // Only used for fallback draws, which this mode never makes.
        Initialization::OrthogonalizedOnes => ChaCha8Rng::seed_from_u64(0),
    }
}

/// Extracts the `min(k, p)` dominant eigenpairs of the symmetric `p x p`
/// matrix `matrix`.
///
/// For every component the starting vector is iterated
/// `settings.max_iterations` times (fewer if `settings.tolerance` is set and
/// the direction stops moving). When the deflated product is no longer than
/// `settings.epsilon` times the largest diagonal entry the matrix has no
/// direction left: the component gets eigenvalue 0 and a unit vector
/// orthogonal to the previous ones.
///
/// # Errors
/// Returns an error if the matrix is not square, is empty, or `k` is 0.
pub fn extract_top_eigenpairs(
    matrix: &ArrayView2<f64>,
    k: usize,
    settings: &SolverSettings,
) -> Result<EigenPairs> {
    let dim = matrix.nrows();
    if dim != matrix.ncols() {
        return Err(PcaError::DimensionMismatch {
            expected: dim,
            found: matrix.ncols(),
            context: "columns of a square matrix".to_string(),
        });
    }
    if dim == 0 {
        return Err(PcaError::EmptyInput);
    }
    if k == 0 {
        return Err(PcaError::InvalidComponents {
            requested: 0,
            available: dim,
        });
    }

    let n_components = k.min(dim);
    // Relative to the largest variance; a zero diagonal exhausts at once.
    let scale = matrix
        .diag()
        .iter()
        .fold(0.0f64, |acc, &d| acc.max(d.abs()));
    let exhausted_below = settings.epsilon * scale;
    let mut rng = make_rng(settings.initialization);

    let mut found: Vec<Array1<f64>> = Vec::with_capacity(n_components);
    let mut values: Vec<f64> = Vec::with_capacity(n_components);
    let mut degenerate: Vec<bool> = Vec::with_capacity(n_components);
    let mut iterations: Vec<usize> = Vec::with_capacity(n_components);

    for component in 0..n_components {
        let mut v = starting_vector(dim, &found, settings.initialization, &mut rng).ok_or_else(|| {
            PcaError::DegenerateInput {
                message: format!("no starting direction available for component {}", component),
            }
        })?;
        let mut eigenvalue = 0.0;
        let mut exhausted = false;
        let mut steps = 0;

        for _ in 0..settings.max_iterations {
            steps += 1;
            let mut w = matrix.dot(&v);
            deflate(&mut w, &found);
            let w_norm = norm(&w);

            if w_norm <= exhausted_below {
                exhausted = true;
                break;
            }

            eigenvalue = w_norm;
            w /= w_norm;

            let converged = settings.tolerance.is_some_and(|tol| {
                let same = (&w - &v).mapv(|x| x * x).sum().sqrt();
                let flipped = (&w + &v).mapv(|x| x * x).sum().sqrt();
                same.min(flipped) < tol
            });
            v = w;
            if converged {
                break;
            }
        }

        if exhausted {
            warn!(
                "Component {} is degenerate: fewer independent directions than requested components.",
                component
            );
            eigenvalue = 0.0;
            v = orthogonal_direction(dim, &found, settings.initialization, &mut rng).ok_or_else(
                || PcaError::DegenerateInput {
                    message: format!(
                        "no direction orthogonal to the first {} components",
                        component
                    ),
                },
            )?;
        }

        trace!(
            "Component {}: eigenvalue {:.6e} after {} iterations.",
            component,
            eigenvalue,
            steps
        );
        found.push(v);
        values.push(eigenvalue);
        degenerate.push(exhausted);
        iterations.push(steps);
    }

    // Extraction order is descending for converged components; a stable sort
    // repairs near-ties left by truncated iteration.
    let mut order: Vec<usize> = (0..n_components).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut eigenvectors = Array2::<f64>::zeros((dim, n_components));
    for (target, &source) in order.iter().enumerate() {
        eigenvectors.column_mut(target).assign(&found[source]);
    }
    let eigenvalues: Array1<f64> = order.iter().map(|&i| values[i]).collect();
    let degenerate: Vec<bool> = order.iter().map(|&i| degenerate[i]).collect();
    let iterations: Vec<usize> = order.iter().map(|&i| iterations[i]).collect();

    debug!(
        "Extracted {} eigenpairs from a {}x{} matrix; iterations per component: {:?}.",
        n_components, dim, dim, iterations
    );

    Ok(EigenPairs {
        eigenvalues,
        eigenvectors,
        degenerate,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn seeded(seed: u64) -> SolverSettings {
        SolverSettings {
            initialization: Initialization::Random { seed: Some(seed) },
            ..Default::default()
        }
    }

    fn assert_orthonormal(vectors: &Array2<f64>) {
        let gram = vectors.t().dot(vectors);
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn recovers_known_spectrum() {
        // Block [[6, 2], [2, 3]] has eigenvalues 7 and 2; the last axis has 1.
        let m = array![[6.0, 2.0, 0.0], [2.0, 3.0, 0.0], [0.0, 0.0, 1.0]];
        let pairs = extract_top_eigenpairs(&m.view(), 3, &seeded(42)).unwrap();

        assert_abs_diff_eq!(pairs.eigenvalues[0], 7.0, epsilon = 1e-8);
        assert_abs_diff_eq!(pairs.eigenvalues[1], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(pairs.eigenvalues[2], 1.0, epsilon = 1e-8);
        assert_orthonormal(&pairs.eigenvectors);

        // Leading eigenvector of the block is (2, 1)/sqrt(5) up to sign.
        let v0 = pairs.eigenvectors.column(0);
        assert_abs_diff_eq!(v0[0].abs(), 2.0 / 5.0f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(v0[1].abs(), 1.0 / 5.0f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(v0[2], 0.0, epsilon = 1e-8);
        assert!(pairs.degenerate.iter().all(|d| !d));
    }

    #[test]
    fn ones_initialization_is_deterministic() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let settings = SolverSettings {
            initialization: Initialization::OrthogonalizedOnes,
            ..Default::default()
        };
        let a = extract_top_eigenpairs(&m.view(), 2, &settings).unwrap();
        let b = extract_top_eigenpairs(&m.view(), 2, &settings).unwrap();
        assert_eq!(a.eigenvectors, b.eigenvectors);
        assert_eq!(a.eigenvalues, b.eigenvalues);

        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(a.eigenvalues[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.eigenvalues[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.eigenvectors[[0, 0]], h, epsilon = 1e-12);
        assert_abs_diff_eq!(a.eigenvectors[[1, 0]], h, epsilon = 1e-12);
        assert_abs_diff_eq!(a.eigenvectors[[0, 1]].abs(), h, epsilon = 1e-12);
        assert_abs_diff_eq!(a.eigenvectors[[0, 1]], -a.eigenvectors[[1, 1]], epsilon = 1e-12);
    }

    #[test]
    fn rank_deficient_matrix_yields_degenerate_tail() {
        let m = array![[1.0, 1.0], [1.0, 1.0]];
        let pairs = extract_top_eigenpairs(&m.view(), 2, &seeded(3)).unwrap();
        assert_abs_diff_eq!(pairs.eigenvalues[0], 2.0, epsilon = 1e-10);
        assert_eq!(pairs.eigenvalues[1], 0.0);
        assert_eq!(pairs.degenerate, vec![false, true]);
        assert_orthonormal(&pairs.eigenvectors);
    }

    #[test]
    fn over_request_returns_matrix_dimension() {
        let m = array![[3.0, 0.0], [0.0, 1.0]];
        let pairs = extract_top_eigenpairs(&m.view(), 5, &seeded(1)).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.eigenvectors.dim(), (2, 2));
    }

    #[test]
    fn zero_matrix_is_fully_degenerate_but_orthonormal() {
        let m = Array2::<f64>::zeros((3, 3));
        let pairs = extract_top_eigenpairs(&m.view(), 3, &seeded(9)).unwrap();
        assert!(pairs.eigenvalues.iter().all(|&v| v == 0.0));
        assert_eq!(pairs.degenerate, vec![true, true, true]);
        assert_orthonormal(&pairs.eigenvectors);
    }

    #[test]
    fn small_scale_spectrum_is_not_exhausted() {
        let m = array![[1e-12, 0.0, 0.0], [0.0, 4e-13, 0.0], [0.0, 0.0, 1e-13]];
        let pairs = extract_top_eigenpairs(&m.view(), 3, &seeded(12)).unwrap();
        assert_eq!(pairs.degenerate, vec![false, false, false]);
        assert_abs_diff_eq!(pairs.eigenvalues[0] / 1e-12, 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(pairs.eigenvalues[1] / 1e-12, 0.4, epsilon = 1e-8);
        assert_abs_diff_eq!(pairs.eigenvalues[2] / 1e-12, 0.1, epsilon = 1e-8);
        assert_orthonormal(&pairs.eigenvectors);
    }

    #[test]
    fn tolerance_allows_early_exit() {
        let m = array![[10.0, 0.0], [0.0, 1.0]];
        let settings = SolverSettings {
            tolerance: Some(1e-9),
            max_iterations: 500,
            ..seeded(5)
        };
        let pairs = extract_top_eigenpairs(&m.view(), 2, &settings).unwrap();
        assert!(pairs.iterations[0] < 500);
        assert_abs_diff_eq!(pairs.eigenvalues[0], 10.0, epsilon = 1e-8);
        assert_abs_diff_eq!(pairs.eigenvalues[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn fixed_iteration_count_without_tolerance() {
        let m = array![[4.0, 1.0], [1.0, 2.0]];
        let pairs = extract_top_eigenpairs(&m.view(), 2, &seeded(11)).unwrap();
        assert_eq!(pairs.iterations, vec![100, 100]);
    }

    #[test]
    fn rejects_non_square_and_zero_k() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            extract_top_eigenpairs(&m.view(), 1, &SolverSettings::default()),
            Err(PcaError::DimensionMismatch { .. })
        ));
        let sq = Array2::<f64>::eye(2);
        assert!(matches!(
            extract_top_eigenpairs(&sq.view(), 0, &SolverSettings::default()),
            Err(PcaError::InvalidComponents { requested: 0, .. })
        ));
    }
}
