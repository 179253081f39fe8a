// src/standardize.rs

//! Input validation and per-feature centering/scaling.

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

use crate::config::{ZeroVariancePolicy, ZERO_VARIANCE_THRESHOLD};
use crate::error::{PcaError, Result};

/// Centered (and optionally scaled) data together with the statistics used.
#[derive(Clone, Debug)]
pub struct Standardization {
    /// `(x - mean) / std`, shape (n_samples, n_features).
    pub standardized: Array2<f64>,
    /// Column means, shape (n_features).
    pub means: Array1<f64>,
    /// Scale factors actually applied, shape (n_features). All ones when
    /// normalization is off; always strictly positive.
    pub stds: Array1<f64>,
}

/// Builds a dense matrix from sample-major rows, rejecting ragged input.
pub fn matrix_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Array2<f64>> {
    let n_samples = rows.len();
    let n_features = rows.first().map_or(0, |row| row.as_ref().len());
    if n_samples == 0 || n_features == 0 {
        return Err(PcaError::EmptyInput);
    }

    let mut flat = Vec::with_capacity(n_samples * n_features);
    for (row_idx, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != n_features {
            return Err(PcaError::RaggedRows {
                row: row_idx,
                expected: n_features,
                found: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }

    Array2::from_shape_vec((n_samples, n_features), flat).map_err(|e| PcaError::DegenerateInput {
        message: format!("Failed to assemble data matrix: {}", e),
    })
}

/// Checks the shape and contents of a data matrix before any computation.
pub fn validate_data(data: &ArrayView2<f64>) -> Result<()> {
    let (n_samples, n_features) = data.dim();
    if n_samples == 0 || n_features == 0 {
        return Err(PcaError::EmptyInput);
    }
    if n_samples < 2 {
        return Err(PcaError::InsufficientSamples { found: n_samples });
    }
    if let Some(((row, column), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(PcaError::NonFiniteValue { row, column });
    }
    Ok(())
}

/// Sample standard deviation (divisor `n - 1`) of each column around `means`.
pub fn column_std_devs(data: &ArrayView2<f64>, means: &Array1<f64>) -> Array1<f64> {
    let denom = (data.nrows().max(2) - 1) as f64;
    let mut sum_sq = Array1::<f64>::zeros(data.ncols());
    for row in data.axis_iter(Axis(0)) {
        Zip::from(&mut sum_sq)
            .and(&row)
            .and(means)
            .for_each(|acc, &x, &m| *acc += (x - m) * (x - m));
    }
    sum_sq.mapv_into(|s| (s / denom).sqrt())
}

/// Centers every column and, when `normalize` is set, scales it to unit
/// sample variance.
///
/// A constant column cannot be scaled. Under [`ZeroVariancePolicy::Sanitize`]
/// its scale factor becomes `1.0`, so it is centered to zeros and contributes
/// no variance; under [`ZeroVariancePolicy::Reject`] the call fails.
///
/// # Errors
/// A feature whose mean or sample variance overflows `f64` is rejected in
/// either mode, before the zero-variance policy applies.
pub fn standardize(
    data: &ArrayView2<f64>,
    normalize: bool,
    policy: ZeroVariancePolicy,
) -> Result<Standardization> {
    validate_data(data)?;
    let n_features = data.ncols();

    let means = data.mean_axis(Axis(0)).ok_or(PcaError::EmptyInput)?;
    if let Some(j) = means.iter().position(|m| !m.is_finite()) {
        return Err(PcaError::DegenerateInput {
            message: format!("feature {} mean overflows f64", j),
        });
    }
    let raw = column_std_devs(data, &means);
    if let Some(j) = raw.iter().position(|s| !s.is_finite()) {
        return Err(PcaError::DegenerateInput {
            message: format!("feature {} variance overflows f64", j),
        });
    }

    let stds = if normalize {
        let mut sanitized = Array1::<f64>::ones(n_features);
        for (j, &s) in raw.iter().enumerate() {
            if s > ZERO_VARIANCE_THRESHOLD {
                sanitized[j] = s;
                continue;
            }
            match policy {
                ZeroVariancePolicy::Sanitize => {
                    warn!(
                        "Feature {} has zero variance; it is centered but not scaled.",
                        j
                    );
                }
                ZeroVariancePolicy::Reject => {
                    return Err(PcaError::DegenerateInput {
                        message: format!(
                            "feature {} has zero variance and cannot be scaled to unit variance",
                            j
                        ),
                    });
                }
            }
        }
        sanitized
    } else {
        Array1::ones(n_features)
    };

    let mut standardized = data.to_owned();
    standardized -= &means;
    if normalize {
        standardized /= &stds;
    }

    debug!(
        "Standardized {}x{} matrix (normalize = {}).",
        data.nrows(),
        n_features,
        normalize
    );

    Ok(Standardization {
        standardized,
        means,
        stds,
    })
}
